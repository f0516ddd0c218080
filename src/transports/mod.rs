pub mod base;
pub mod command_transport;
pub mod http_transport;

// Re-export from base.rs so we can do "use crate::transports::*;"
pub use base::*;
