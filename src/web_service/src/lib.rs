pub mod http_server;
pub mod tunnel_handler;

/// Broadcast on the shutdown watch channel.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ShutdownMessage {
    // channel initialisation value, never acted on.
    Init,
    Cancel(String),
}
