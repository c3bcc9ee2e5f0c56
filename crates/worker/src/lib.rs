pub mod client;
pub mod error;
pub mod processor;

pub use client::{RunStats, WorkerClient};
pub use error::WorkerError;
pub use processor::{Processor, Sha256Processor};
