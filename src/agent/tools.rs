//! Tools exposed to the realtime agent.

use crate::realtime::{FunctionTool, ToolError};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Arguments accepted by `get_weather`.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherArgs {
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
    /// `metric` when absent or null.
    #[serde(default)]
    pub units: Option<String>,
}

/// Temperature unit symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemperatureUnit {
    #[serde(rename = "°C")]
    Celsius,
    #[serde(rename = "°F")]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Fahrenheit only for `imperial`, Celsius for anything else.
    pub fn from_units(units: &str) -> Self {
        if units == "imperial" {
            TemperatureUnit::Fahrenheit
        } else {
            TemperatureUnit::Celsius
        }
    }
}

/// Weather report returned to the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub location: String,
    pub temperature: i32,
    pub units: TemperatureUnit,
    pub condition: String,
    pub humidity: u8,
    pub wind_speed: u32,
}

/// Mock weather lookup. The figures are fixed; only location and units vary.
pub fn get_weather(args: WeatherArgs) -> Result<WeatherReport, ToolError> {
    let units = args.units.as_deref().unwrap_or("metric");
    info!(city = %args.city, country = ?args.country, %units, "get_weather request");

    let location = match args.country.as_deref().filter(|c| !c.is_empty()) {
        Some(country) => format!("{}, {}", args.city, country),
        None => args.city.clone(),
    };

    Ok(WeatherReport {
        location,
        temperature: 22,
        units: TemperatureUnit::from_units(units),
        condition: "Partly Cloudy".to_string(),
        humidity: 65,
        wind_speed: 10,
    })
}

/// `get_weather` tool definition.
pub fn weather_tool() -> FunctionTool {
    FunctionTool::new(
        "get_weather",
        "Call this function to retrieve current weather information for a specific location. \
        Provide the city name.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The name of the city to get weather information for"
                },
                "country": {
                    "type": "string",
                    "description": "The country the city is in"
                },
                "units": {
                    "type": "string",
                    "enum": ["metric", "imperial"],
                    "description": "Unit system for the temperature (default: metric)",
                    "default": "metric"
                }
            },
            "required": ["city"]
        }),
        get_weather,
    )
}
