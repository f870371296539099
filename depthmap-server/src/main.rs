mod handler;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{routing::get, Router, Server};
use depthmap::{Config, QueryService, SqliteRowStore};
use tokio::runtime::Builder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use handler::*;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    depthmap::init(&config);

    let store = SqliteRowStore::open(&config.db_path)?;
    let service = QueryService::new(store, config.default_colormap, config.depth_bounds);
    let app = app(Arc::new(Mutex::new(service)), config.request_timeout());

    let rt = Builder::new_multi_thread().enable_all().build()?;
    let _guard = rt.enter();
    let server = Server::bind(&config.socket_addr()?).serve(app.into_make_service());
    let addr = server.local_addr();
    info!(%addr, db_path = ?config.db_path, "listening");

    rt.block_on(server)?;

    Ok(())
}

fn app(service: Service, timeout: Duration) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/image_frame", get(image_frame))
        .route("/image_frame_base64", get(image_frame_base64))
        .route("/frame_stats", get(frame_stats))
        .with_state(service)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}
