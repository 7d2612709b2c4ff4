//! Tool: sleep — wait for a duration, reporting progress along the way.
//!
//! Exists mostly to exercise the async job path: it is cancellable between
//! steps and reports progress in even increments.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use agentic_gateway::{JobExecutor, ProgressReporter};

use super::registry::ToolSpec;

const MAX_DURATION_MS: u64 = 600_000;

#[derive(Debug, Deserialize)]
struct SleepParams {
    duration_ms: u64,
    #[serde(default = "default_steps")]
    steps: u32,
}

fn default_steps() -> u32 {
    4
}

pub fn spec() -> ToolSpec {
    ToolSpec {
        tool_id: "sleep".to_string(),
        description: Some("Sleep for a duration, reporting progress".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "duration_ms": {
                    "type": "integer",
                    "minimum": 0,
                    "maximum": MAX_DURATION_MS,
                    "description": "Total time to sleep, in milliseconds"
                },
                "steps": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 100,
                    "description": "Number of progress increments"
                }
            },
            "required": ["duration_ms"]
        }),
        output_schema: Some(json!({
            "type": "object",
            "properties": {
                "slept_ms": { "type": "integer", "minimum": 0 }
            },
            "required": ["slept_ms"]
        })),
        executor: std::sync::Arc::new(SleepExecutor),
    }
}

struct SleepExecutor;

#[async_trait]
impl JobExecutor for SleepExecutor {
    async fn run(
        &self,
        arguments: Value,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> anyhow::Result<Value> {
        let params: SleepParams = serde_json::from_value(arguments)?;
        let steps = params.steps.max(1);
        let step_duration = Duration::from_millis(params.duration_ms / u64::from(steps));

        let mut slept = Duration::ZERO;
        for step in 1..=steps {
            tokio::select! {
                _ = cancel.cancelled() => {
                    anyhow::bail!("cancelled after {}ms", slept.as_millis());
                }
                _ = tokio::time::sleep(step_duration) => {
                    slept += step_duration;
                    progress.report(((step * 100) / steps) as u8);
                }
            }
        }

        Ok(json!({ "slept_ms": slept.as_millis() as u64 }))
    }
}
