pub mod executor;
pub mod job;
pub mod pool;

use std::any::Any;

pub use executor::{JobExecutor, MediaJobExecutor};
pub use job::{Job, JobDescriptor, JobOutcome};
pub use pool::{PoolConfig, PoolState, PoolStatus, WorkerPool};

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
