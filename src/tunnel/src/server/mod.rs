pub mod dispatcher;
pub mod request;
pub mod tunnel_cli_args;

/// Response content type. The `x-user-defined` charset keeps HTTP clients
/// from transcoding the framed bytes.
pub const TUNNEL_CONTENT_TYPE: &str = "text/plain; charset=x-user-defined";
