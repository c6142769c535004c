//! Date and time utility tools.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{BoxFuture, ParamKind, ParamSpec, Tool, ToolOutput};
use crate::error::ToolError;

/// Current time in a requested IANA timezone
pub struct CurrentTime;

impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in a specific IANA timezone \
         (e.g., 'UTC', 'America/New_York', 'Asia/Tokyo')."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::optional(
            "timezone",
            ParamKind::String,
            "IANA timezone name, defaults to UTC",
            json!("UTC"),
        )]
    }

    fn execute(&self, args: Map<String, Value>) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let timezone = args["timezone"].as_str().unwrap_or("UTC");
            info!(timezone, "Getting current time");

            let tz: Tz = match timezone.parse() {
                Ok(tz) => tz,
                Err(_) => {
                    warn!(timezone, "Invalid timezone");
                    return Ok(ToolOutput::error(
                        "invalid_timezone",
                        format!("Invalid timezone '{}'. Use an IANA name like 'Asia/Tokyo'", timezone),
                    ));
                }
            };

            let now = Utc::now().with_timezone(&tz);
            Ok(ToolOutput::success(json!({
                "timezone": timezone,
                "datetime": now.format("%Y-%m-%d %H:%M:%S").to_string(),
                "date": now.format("%Y-%m-%d").to_string(),
                "time": now.format("%H:%M:%S").to_string(),
                "day_of_week": now.format("%A").to_string(),
                "iso_format": now.to_rfc3339(),
            })))
        })
    }
}

/// Add or subtract days from a date
pub struct DateCalculator;

impl Tool for DateCalculator {
    fn name(&self) -> &str {
        "date_calculator"
    }

    fn description(&self) -> &str {
        "Calculate dates by adding or subtracting a number of days from a \
         starting date in YYYY-MM-DD format."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required(
                "start_date",
                ParamKind::String,
                "Starting date in YYYY-MM-DD format",
            ),
            ParamSpec::required(
                "operation",
                ParamKind::String,
                "Operation to perform: 'add' or 'subtract'",
            ),
            ParamSpec::optional(
                "days",
                ParamKind::Integer,
                "Number of days to add or subtract",
                json!(0),
            ),
        ]
    }

    fn execute(&self, args: Map<String, Value>) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let start_date = args["start_date"].as_str().unwrap_or("");
            let operation = args["operation"].as_str().unwrap_or("").to_lowercase();
            let days = args["days"].as_f64().unwrap_or(0.0) as i64;
            info!(start_date, operation = %operation, days, "Date calculation");

            let start = match NaiveDate::parse_from_str(start_date, "%Y-%m-%d") {
                Ok(date) => date,
                Err(_) => {
                    return Ok(ToolOutput::error(
                        "invalid_date_format",
                        "Invalid date format. Use YYYY-MM-DD (e.g., 2024-01-15)",
                    ))
                }
            };

            let result = match operation.as_str() {
                "add" => start + Duration::days(days),
                "subtract" => start - Duration::days(days),
                other => {
                    warn!(operation = other, "Invalid operation");
                    return Ok(ToolOutput::error(
                        "invalid_operation",
                        format!("Invalid operation '{}'. Use 'add' or 'subtract'", other),
                    ));
                }
            };

            Ok(ToolOutput::success(json!({
                "start_date": start_date,
                "operation": operation,
                "days": days,
                "result_date": result.format("%Y-%m-%d").to_string(),
                "day_of_week": result.weekday().to_string(),
            })))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_days_crosses_month_boundary() {
        let mut args = Map::new();
        args.insert("start_date".to_string(), json!("2024-01-15"));
        args.insert("operation".to_string(), json!("add"));
        args.insert("days".to_string(), json!(30));

        let out = DateCalculator.execute(args).await.unwrap();
        assert!(out.success);
        assert_eq!(out.content["result_date"], json!("2024-02-14"));
    }

    #[tokio::test]
    async fn bad_date_format_is_reported() {
        let mut args = Map::new();
        args.insert("start_date".to_string(), json!("15/01/2024"));
        args.insert("operation".to_string(), json!("add"));
        args.insert("days".to_string(), json!(1));

        let out = DateCalculator.execute(args).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.error_type.as_deref(), Some("invalid_date_format"));
    }

    #[tokio::test]
    async fn invalid_timezone_is_reported() {
        let mut args = Map::new();
        args.insert("timezone".to_string(), json!("Mars/Olympus_Mons"));

        let out = CurrentTime.execute(args).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.error_type.as_deref(), Some("invalid_timezone"));
    }

    #[tokio::test]
    async fn utc_time_has_expected_fields() {
        let mut args = Map::new();
        args.insert("timezone".to_string(), json!("UTC"));

        let out = CurrentTime.execute(args).await.unwrap();
        assert!(out.success);
        assert!(out.content["datetime"].is_string());
        assert!(out.content["iso_format"].is_string());
    }
}
