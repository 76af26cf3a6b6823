pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod scoring;

// Layered boundaries: ports in app, adapters in infra
pub mod app;
pub mod infra;

// Provider record and job data shapes shared across layers
pub mod domain;
