// Observability: Prometheus metrics for jobs and records

pub mod metrics;

pub use metrics::{init, render};
