use std::sync::Arc;

pub mod config;
pub mod error;
pub mod middleware;
pub mod net;
pub mod record;
pub mod routes;
pub mod server;
pub mod sink;
pub mod telemetry;

pub use middleware::{request_logging, RequestLogger, SecureTransport};
pub use record::AccessRecord;
pub use sink::{LogSink, MemorySink, TracingSink};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
}
