//! Realtime agent configuration.
//!
//! Once the video platform has bridged a call to the AI agent, the session
//! is given its instructions, its tools and a pair of logging observers.

mod tools;

pub use tools::{get_weather, weather_tool, TemperatureUnit, WeatherArgs, WeatherReport};

use crate::config::AgentSettings;
use crate::error::Result;
use crate::realtime::{RealtimeError, RealtimeSession, SessionUpdate};
use tracing::{error, info};

/// Configure a freshly bridged agent session.
///
/// Observers are registered first so errors raised while configuring are
/// logged. Callers must tear the session down if this fails.
pub async fn setup_session(session: &dyn RealtimeSession, settings: &AgentSettings) -> Result<()> {
    session.on_error(Box::new(|event: &RealtimeError| {
        error!(kind = %event.kind, code = ?event.code, message = %event.message, "Realtime agent error");
    }));

    session.on_session_update(Box::new(|session: &serde_json::Value| {
        info!(%session, "Realtime session update");
    }));

    session
        .update_session(SessionUpdate::instructions(&settings.instructions))
        .await?;

    session.add_tool(weather_tool()).await?;

    Ok(())
}
