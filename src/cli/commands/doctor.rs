//! Doctor command - verify credentials and configuration.

use crate::cli::{mask_secret, Output};
use crate::config::{Settings, OPENAI_API_KEY, REQUIRED_VARS};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("callbridge Doctor");
    println!();

    let mut checks = Vec::new();

    println!("{}", style("Environment").bold());
    for name in REQUIRED_VARS {
        let check = check_env_var(name, std::env::var(name).ok().as_deref());
        check.print();
        checks.push(check);
    }

    println!();

    println!("{}", style("AI Provider").bold());
    let openai_check = match std::env::var(OPENAI_API_KEY) {
        Ok(key) if !key.trim().is_empty() => check_openai_key(&key).await,
        _ => CheckResult::warning("OpenAI API", "skipped", "Set OPENAI_API_KEY first"),
    };
    openai_check.print();
    checks.push(openai_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![check_config_file(), check_base_url(settings)];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);
    Output::kv(
        "Listen address",
        &format!("{}:{}", settings.server.host, settings.server.port),
    );
    Output::kv("Agent user", &settings.agent.user_id);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. The server will not start until they are fixed.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! callbridge is ready to serve.");
    }

    Ok(())
}

/// Check a required environment variable's value.
fn check_env_var(name: &str, value: Option<&str>) -> CheckResult {
    let hint = format!("Set {} in the environment or in .env", name);
    match value {
        Some(v) if !v.trim().is_empty() => {
            CheckResult::ok(name, &format!("configured ({})", mask_secret(v)))
        }
        Some(_) => CheckResult::error(name, "empty", &hint),
        None => CheckResult::error(name, "not set", &hint),
    }
}

/// Verify the OpenAI key against the API.
async fn check_openai_key(key: &str) -> CheckResult {
    match crate::openai::verify_api_key(key).await {
        Ok(models) => CheckResult::ok("OpenAI API", &format!("key accepted ({} models)", models)),
        Err(e) => CheckResult::error(
            "OpenAI API",
            &format!("key rejected: {}", e),
            "Check OPENAI_API_KEY and network access",
        ),
    }
}

/// Check the platform base URL parses.
fn check_base_url(settings: &Settings) -> CheckResult {
    match url::Url::parse(&settings.stream.base_url) {
        Ok(url) if matches!(url.scheme(), "https" | "http" | "wss" | "ws") => {
            CheckResult::ok("Platform URL", url.as_str())
        }
        Ok(url) => CheckResult::error(
            "Platform URL",
            &format!("unsupported scheme '{}'", url.scheme()),
            "Use an https:// URL for stream.base_url",
        ),
        Err(e) => CheckResult::error(
            "Platform URL",
            &format!("invalid: {}", e),
            "Fix stream.base_url in the config file",
        ),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create {} to override", config_path.display()),
        )
    }
}
