//! OpenAI client configuration with sensible defaults.

use crate::error::{BridgeError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Create an OpenAI client for `api_key` with the default timeout.
pub fn create_client(api_key: &str) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(api_key: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;
    let config = OpenAIConfig::new().with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Check that `api_key` is accepted by listing models.
///
/// Returns the number of models visible to the key.
pub async fn verify_api_key(api_key: &str) -> Result<usize> {
    let client = create_client(api_key)?;
    let models = client
        .models()
        .list()
        .await
        .map_err(|e| BridgeError::OpenAI(e.to_string()))?;
    Ok(models.data.len())
}
