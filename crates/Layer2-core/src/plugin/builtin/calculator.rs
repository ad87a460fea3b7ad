//! Calculator plugin
//!
//! `execute(["add", "1", "2.5"])` → `{"operation":"add","numbers":[1.0,2.5],"result":3.5}`
//!
//! Config: `precision` (decimal places, default 2), `max_value` (largest
//! absolute result, default 1e10).

use crate::plugin::registry::PluginFactory;
use crate::plugin::traits::{Plugin, PluginContext, PluginOutput};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use thot_foundation::{Error, Result};
use tracing::error;

/// 매니페스트의 `plugin` 값
pub const KIND: &str = "calculator";

pub const DEFAULT_PRECISION: u32 = 2;
pub const DEFAULT_MAX_VALUE: f64 = 1e10;

const OPERATIONS: &str = "add, subtract, multiply, divide";
const EXAMPLE: &str = "/plugin <name> add 1 2 3";

pub fn factory() -> PluginFactory {
    Arc::new(|ctx| Box::new(CalculatorPlugin::new(ctx)) as Box<dyn Plugin>)
}

pub struct CalculatorPlugin {
    ctx: PluginContext,
    precision: u32,
    max_value: f64,
}

impl CalculatorPlugin {
    pub fn new(ctx: PluginContext) -> Self {
        Self {
            ctx,
            precision: DEFAULT_PRECISION,
            max_value: DEFAULT_MAX_VALUE,
        }
    }

    fn calculate(&self, operation: &str, numbers: &[f64]) -> std::result::Result<f64, String> {
        let (first, rest) = numbers
            .split_first()
            .ok_or_else(|| "Numbers required".to_string())?;

        let result = match operation {
            "add" => numbers.iter().sum(),
            "multiply" => numbers.iter().product(),
            "subtract" => first - rest.iter().sum::<f64>(),
            "divide" => {
                let mut result = *first;
                for n in rest {
                    if *n == 0.0 {
                        return Err("Division by zero".to_string());
                    }
                    result /= n;
                }
                result
            }
            other => return Err(format!("Unsupported operation: {}", other)),
        };

        if !result.is_finite() || result.abs() > self.max_value {
            return Err("Result exceeds maximum allowed value".to_string());
        }
        Ok(round_to(result, self.precision))
    }
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision.min(15) as i32);
    (value * factor).round() / factor
}

fn parse_number(raw: &str) -> std::result::Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("Invalid number: {}", raw))
}

#[async_trait]
impl Plugin for CalculatorPlugin {
    fn description(&self) -> &str {
        "Basic arithmetic over a list of numbers"
    }

    fn usage(&self) -> &str {
        "<add|subtract|multiply|divide> <number>..."
    }

    fn context(&self) -> &PluginContext {
        &self.ctx
    }

    async fn initialize(&mut self) -> Result<bool> {
        let config = self.ctx.config();

        if let Some(raw) = config.get("precision") {
            self.precision = raw
                .trim()
                .parse()
                .map_err(|_| Error::Validation(format!("Invalid precision: {}", raw)))?;
        }
        if let Some(raw) = config.get("max_value") {
            self.max_value = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| *v > 0.0)
                .ok_or_else(|| Error::Validation(format!("Invalid max_value: {}", raw)))?;
        }
        Ok(true)
    }

    async fn execute(&self, args: &[String]) -> PluginOutput {
        let Some((operation, raw_numbers)) = args.split_first() else {
            return PluginOutput::error_with_example(
                format!("Operation required. Available operations: {}", OPERATIONS),
                EXAMPLE,
            );
        };
        if raw_numbers.is_empty() {
            return PluginOutput::error_with_example("Numbers required", EXAMPLE);
        }

        let numbers = match raw_numbers
            .iter()
            .map(|n| parse_number(n))
            .collect::<std::result::Result<Vec<f64>, String>>()
        {
            Ok(numbers) => numbers,
            Err(message) => return PluginOutput::error(message),
        };

        let operation = operation.to_ascii_lowercase();
        match self.calculate(&operation, &numbers) {
            Ok(result) => PluginOutput::success(json!({
                "operation": operation,
                "numbers": numbers,
                "result": result,
            })),
            Err(message) => {
                error!("Calculator error: {}", message);
                PluginOutput::error(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thot_foundation::ConfigStore;

    async fn calculator(overrides: &[(&str, &str)]) -> CalculatorPlugin {
        let store = Arc::new(ConfigStore::empty());
        if !overrides.is_empty() {
            store.set_many("Plugin.Calculator", overrides.iter().copied()).unwrap();
        }
        let mut plugin = CalculatorPlugin::new(PluginContext::new("Calculator", store));
        assert!(plugin.initialize().await.unwrap());
        plugin
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn result_of(output: PluginOutput) -> f64 {
        match output {
            PluginOutput::Success { data } => data["result"].as_f64().unwrap(),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_operations() {
        let calc = calculator(&[]).await;
        assert_eq!(result_of(calc.execute(&args(&["add", "1", "2", "3"])).await), 6.0);
        assert_eq!(result_of(calc.execute(&args(&["subtract", "10", "2", "3"])).await), 5.0);
        assert_eq!(result_of(calc.execute(&args(&["multiply", "2", "2.5"])).await), 5.0);
        assert_eq!(result_of(calc.execute(&args(&["divide", "10", "3"])).await), 3.33);
    }

    #[tokio::test]
    async fn test_precision_from_config() {
        let calc = calculator(&[("precision", "4")]).await;
        assert_eq!(result_of(calc.execute(&args(&["divide", "10", "3"])).await), 3.3333);
    }

    #[tokio::test]
    async fn test_errors_are_outputs() {
        let calc = calculator(&[("max_value", "100")]).await;

        let output = calc.execute(&args(&["divide", "1", "0"])).await;
        assert_eq!(output, PluginOutput::error("Division by zero"));

        let output = calc.execute(&args(&["multiply", "50", "3"])).await;
        assert_eq!(output, PluginOutput::error("Result exceeds maximum allowed value"));

        let output = calc.execute(&args(&["pow", "2", "3"])).await;
        assert_eq!(output, PluginOutput::error("Unsupported operation: pow"));

        let output = calc.execute(&args(&["add", "1", "two"])).await;
        assert_eq!(output, PluginOutput::error("Invalid number: two"));

        assert!(!calc.execute(&[]).await.is_success());
        assert!(!calc.execute(&args(&["add"])).await.is_success());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_initialize() {
        let store = Arc::new(ConfigStore::empty());
        store.set("Plugin.Calculator", "precision", "lots").unwrap();
        let mut plugin = CalculatorPlugin::new(PluginContext::new("Calculator", store));
        assert!(plugin.initialize().await.is_err());
    }
}
