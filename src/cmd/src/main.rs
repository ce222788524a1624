use clap::Parser;
use std::str::FromStr;
use tokio::sync::watch;
use tokio::sync::watch::Receiver;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use tunnel::server::tunnel_cli_args::TunnelServerArgs;
use web_service::http_server::TunnelRest;
use web_service::ShutdownMessage;

async fn shutdown_await(mut shutdown_rx: Box<Receiver<ShutdownMessage>>) {
    let changed_rs = &shutdown_rx.changed().await;
    if changed_rs.is_ok() {
        let canceled = shutdown_rx.borrow_and_update().clone();
        if let ShutdownMessage::Cancel(msg) = canceled {
            info!("TunnelSrv process receive shutdown msg {msg}");
        }
    }
}

async fn shutdown_signal() -> ShutdownMessage {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        ctrl_c_v = ctrl_c => {
            let msg = format!("TunnelSrv receive ctrl_c signal  {ctrl_c_v:?}");
            ShutdownMessage::Cancel(msg)
        },
        v = terminate => {
            let msg = format!("TunnelSrv receive terminate signal  {v:?}");
            ShutdownMessage::Cancel(msg)
        },
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tunnel_config = TunnelServerArgs::parse();
    let log_level_string = tunnel_config
        .log_level
        .clone()
        .unwrap_or("INFO".to_string());
    let level = Level::from_str(log_level_string.as_str())?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("INFO,hyper=INFO,tower=INFO,h2=INFO"))
        .add_directive(level.into())
        .add_directive("hyper=INFO".parse().unwrap())
        .add_directive("h2=INFO".parse().unwrap())
        .add_directive("tower=INFO".parse().unwrap());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_line_number(true)
        .init();

    let works = tunnel_config.works;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("MY_TUNNEL")
        .worker_threads(works)
        .build()?;

    info!("TunnelSrv running config args={:?}", tunnel_config);
    let (shutdown_tx, shutdown_rx) = watch::channel(ShutdownMessage::Init);
    runtime.block_on(async {
        let shutdown_rx_clone = Box::new(shutdown_rx.clone());
        let server = tokio::spawn(TunnelRest::start_server(
            tunnel_config.listen_addr.clone(),
            tunnel_config.port,
            shutdown_await(shutdown_rx_clone),
        ));

        let shutdown_msg = shutdown_signal().await;
        shutdown_tx.send(shutdown_msg)?;
        server.await??;
        Ok(())
    })
}
