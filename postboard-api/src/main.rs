#![recursion_limit = "256"]

use axum::http::{Method, header::CONTENT_TYPE};
use postboard_common::snowflake::{ProcessId, SnowflakePartOutOfRangeError, WorkerId};
use postboard_store::PostStore;
use serde::Deserialize;
use server::ServerState;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use storage::{LocalStorage, UPLOADS_ROUTE};
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;
mod storage;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid snowflake configuration: {0}")]
    Snowflake(#[from] SnowflakePartOutOfRangeError),
    #[error("Error creating upload directory: {0}")]
    UploadDir(std::io::Error),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    /// Base URL under which uploaded images are reachable.
    public_url: Option<String>,
    #[serde(default = "default_upload_dir")]
    upload_dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    max_upload_bytes: usize,
    #[serde(default)]
    worker_id: u8,
    #[serde(default)]
    process_id: u8,
    #[serde(default = "default_seed_example_post")]
    seed_example_post: bool,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_seed_example_post() -> bool {
    true
}

impl Env {
    fn server_address(&self) -> SocketAddr {
        SocketAddr::new(self.server_address, self.server_port)
    }

    fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.server_address()))
    }
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "postboard_api=debug,\
                postboard_store=debug,\
                tower_http=debug,axum::rejection=trace"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let store = PostStore::new(
        WorkerId::try_from(env.worker_id)?,
        ProcessId::try_from(env.process_id)?,
    );
    if env.seed_example_post {
        store.seed_example_post();
    }

    tokio::fs::create_dir_all(&env.upload_dir)
        .await
        .map_err(InitError::UploadDir)?;
    let storage = LocalStorage::new(env.upload_dir.clone(), &env.public_url());

    let state = ServerState {
        store: Arc::new(store),
        storage: Arc::new(storage),
    };

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);
    let app = server::app(state, env.max_upload_bytes)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&env.upload_dir))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http());

    let server_address = env.server_address();
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, public_url = %env.public_url(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
