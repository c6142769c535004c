//! Weather information tool using the OpenWeatherMap API.

use serde_json::{json, Map, Value};
use tracing::{error, info};

use super::{BoxFuture, ParamKind, ParamSpec, Tool, ToolOutput};
use crate::error::ToolError;

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

pub struct Weather {
    api_key: Option<String>,
    client: reqwest::Client,
}

impl Weather {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

impl Tool for Weather {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get current weather information for a city: temperature, conditions, \
         humidity, and wind speed."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("city", ParamKind::String, "Name of the city"),
            ParamSpec::optional(
                "units",
                ParamKind::String,
                "Temperature units: 'metric' (Celsius) or 'imperial' (Fahrenheit)",
                json!("metric"),
            ),
        ]
    }

    fn execute(&self, args: Map<String, Value>) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let city = args["city"].as_str().unwrap_or("");
            let units = args["units"].as_str().unwrap_or("metric");
            info!(city, units, "Fetching weather");

            let Some(api_key) = self.api_key.as_deref() else {
                error!("OpenWeather API key not configured");
                return Ok(ToolOutput::error(
                    "api_key_missing",
                    "Weather API key not configured. Set OPENWEATHER_API_KEY",
                ));
            };

            let response = self
                .client
                .get(BASE_URL)
                .query(&[("q", city), ("appid", api_key), ("units", units)])
                .send()
                .await;

            let response = match response {
                Ok(resp) => resp,
                Err(e) => {
                    error!(error = %e, "Weather request failed");
                    return Ok(ToolOutput::error("request_failed", e.to_string()));
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                return Ok(ToolOutput::error(
                    "request_failed",
                    format!("Weather API returned {}", status),
                ));
            }

            let data: Value = match response.json().await {
                Ok(data) => data,
                Err(e) => return Ok(ToolOutput::error("invalid_response", e.to_string())),
            };

            Ok(ToolOutput::success(json!({
                "city": city,
                "units": units,
                "temperature": data["main"]["temp"],
                "feels_like": data["main"]["feels_like"],
                "humidity": data["main"]["humidity"],
                "description": data["weather"][0]["description"],
                "wind_speed": data["wind"]["speed"],
            })))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_structured_error() {
        let tool = Weather::new(None);
        let mut args = Map::new();
        args.insert("city".to_string(), json!("London"));
        args.insert("units".to_string(), json!("metric"));

        let out = tool.execute(args).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.error_type.as_deref(), Some("api_key_missing"));
    }
}
