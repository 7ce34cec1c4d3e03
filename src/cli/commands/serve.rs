//! Serve command - run the HTTP API server.

use crate::cli::Output;
use crate::config::Settings;
use crate::server;

/// Run the HTTP API server with credentials from the environment.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    serve_with(host, port, settings, |name| std::env::var(name).ok()).await
}

/// Run the HTTP API server with credentials from `lookup`.
///
/// Credentials are validated before the listener is bound, so a missing
/// secret never leaves a half-started server behind.
pub async fn serve_with<F>(
    host: Option<String>,
    port: Option<u16>,
    mut settings: Settings,
    lookup: F,
) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = server::prepare(settings, lookup)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("callbridge API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Credentials", "GET  /credentials");
    Output::kv("Connect agent", "POST /:id/connect");
    Output::kv("Disconnect agent", "POST /:id/disconnect");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    server::serve(listener, state).await?;

    Ok(())
}
