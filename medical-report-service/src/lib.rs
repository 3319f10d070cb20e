pub mod config;
pub mod models;
pub mod oracle;
pub mod service;
pub mod telemetry;
pub mod ui;

pub use config::{OracleBackend, ServiceConfig};
pub use oracle::build_oracle;
pub use service::{AppState, build_router, purge_idle_sessions, spawn_session_sweeper};
pub use telemetry::init_tracing;
