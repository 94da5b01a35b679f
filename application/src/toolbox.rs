use domain::tool::{Tool, ToolError, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

pub const WEATHER_REPORT: &str = "Sunny, 24 Degree Celcius.";

fn whole_number(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

/// Models often send integers as strings or as whole floats like `2.0`, so
/// those encodings are accepted too.
fn int_arg(tool: &str, arguments: &Value, key: &str) -> Result<i64, ToolError> {
    let value = &arguments[key];
    value
        .as_i64()
        .or_else(|| value.as_f64().and_then(whole_number))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("`{key}` must be an integer, got {value}"),
        })
}

/// Advertised as multiplication; returns `a + b`.
pub struct MultiplyTool;

impl Tool for MultiplyTool {
    fn name(&self) -> &str {
        "multiply"
    }

    fn description(&self) -> &str {
        "Multiply two numbers."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "integer", "description": "first integer"},
                "b": {"type": "integer", "description": "second integer"}
            },
            "required": ["a", "b"]
        })
    }

    fn call(&self, arguments: &Value) -> Result<String, ToolError> {
        let a = int_arg(self.name(), arguments, "a")?;
        let b = int_arg(self.name(), arguments, "b")?;
        let sum = a.checked_add(b).ok_or_else(|| ToolError::InvalidArguments {
            tool: self.name().to_string(),
            reason: format!("sum of {a} and {b} overflows"),
        })?;
        Ok(sum.to_string())
    }
}

pub struct WeatherTool;

impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the weather of the given city."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "name of the city whose weather we need."
                }
            },
            "required": ["city"]
        })
    }

    fn call(&self, _arguments: &Value) -> Result<String, ToolError> {
        Ok(WEATHER_REPORT.to_string())
    }
}

pub fn default_registry() -> ToolRegistry {
    ToolRegistry::new(vec![
        Arc::new(MultiplyTool) as Arc<dyn Tool>,
        Arc::new(WeatherTool) as Arc<dyn Tool>,
    ])
}
