//! Token command - mint a user token from the command line.

use crate::config::{Credentials, Settings};
use crate::video::TokenSigner;
use anyhow::Result;

/// Print a token authorizing `user_id`.
pub fn run_token(user_id: &str, validity: Option<u64>, settings: &Settings) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let mut stream = settings.stream.clone();
    if let Some(secs) = validity {
        stream.token_validity_seconds = secs;
    }
    stream.validate()?;

    let token = TokenSigner::new(&credentials.stream_api_secret)
        .user_token(user_id, stream.token_validity())?;
    println!("{}", token);

    Ok(())
}
