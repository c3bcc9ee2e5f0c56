pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod registry;
pub mod results;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod state;
pub mod task;

pub use config::{HttpConfig, ResultsConfig, SchedulerConfig};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::SchedulerError;
pub use metrics::{MetricsSnapshot, SchedulerMetrics};
pub use queue::TaskQueue;
pub use registry::{SelectionPolicy, WorkerHandle, WorkerId, WorkerRegistry};
pub use results::{ResultStore, StoredResult};
pub use server::SchedulerServer;
pub use session::run_session;
pub use state::{SchedulerState, SharedState};
pub use task::{Task, TaskId};
