use crate::tunnel_handler::tunnel_post;

use anyhow::anyhow;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tunnel::backend::session::MySqlConnector;

pub struct TunnelRest;

#[derive(Clone)]
pub struct TunnelRestState {
    connector: MySqlConnector,
}

impl TunnelRestState {
    pub fn connector(&self) -> &MySqlConnector {
        &self.connector
    }
}

impl TunnelRest {
    pub async fn start_server<F>(addr: String, port: u16, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app_state = TunnelRestState {
            connector: MySqlConnector,
        };
        let app = Router::new()
            .route("/", get("Hi I'm TunnelREST"))
            .route("/tunnel", post(tunnel_post))
            .with_state(app_state)
            .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new()));

        let listener = tokio::net::TcpListener::bind(format!("{addr}:{port}")).await?;
        match axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                println!("Failed to start TunnelRest {e:?}");
                Err(anyhow!(e.to_string()))
            }
        }
    }
}
