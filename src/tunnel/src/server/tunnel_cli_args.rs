use clap::Parser;

#[derive(Parser, Default, Debug, Clone)]
#[clap(
    name = "my-tunnel",
    version = "0.1.0",
    about = "http tunnel endpoint for mysql clients that cannot reach the server port."
)]
pub struct TunnelServerArgs {
    #[clap(long, value_name = "WORKS", default_value_t = 4)]
    pub works: usize,
    #[clap(short = 'p', long, value_name = "PORT", default_value_t = 8080)]
    pub port: u16,
    #[clap(long, value_name = "LISTEN_ADDR", default_value = "0.0.0.0")]
    pub listen_addr: String,
    #[clap(long, value_name = "LOG_LEVEL")]
    pub log_level: Option<String>,
}
