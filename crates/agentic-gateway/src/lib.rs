//! AgenticGateway — core job orchestration and schema contracts for
//! tool-invocation protocols: trackable async jobs with progress,
//! cooperative cancellation, TTL expiry, and schema-validated payloads.

pub mod error;
pub mod events;
pub mod manager;
pub mod types;
pub mod validator;

pub use error::JobError;
pub use events::{EventSink, GatewayEvent, TracingEventSink};
pub use manager::{AsyncJobManager, JobExecutor, ProgressReporter};
pub use types::*;
pub use validator::{upgrade_tool_schema, CacheStats, SchemaValidator};
