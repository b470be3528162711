// Middleware modules
pub mod body;
pub mod logging;
pub mod real_ip;

pub use logging::{request_logging, RequestLogger};
pub use real_ip::{real_ip, RemoteAddr};

/// Request extension marking a connection that arrived over TLS. Inserted
/// by whatever terminates TLS in front of the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecureTransport;
