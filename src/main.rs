mod config;
mod db;
mod entities;
mod error;
mod models;
mod routes;
mod storage;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    storage::{FilmDbStorage, LikeDbStorage, ReferenceDbStorage, UserDbStorage},
};

pub struct AppState {
    pub films: FilmDbStorage,
    pub users: UserDbStorage,
    pub reference: ReferenceDbStorage,
}

impl AppState {
    pub fn new(db: DatabaseConnection) -> Self {
        let users = UserDbStorage::new(db.clone());
        let reference = ReferenceDbStorage::new(db.clone());
        let likes = LikeDbStorage::new(db.clone());
        let films = FilmDbStorage::new(db, users.clone(), likes, reference.clone());
        Self { films, users, reference }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,filmorate=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let db = db::connect_and_migrate(&config.database_url, config.db_max_connections).await?;
    let state = Arc::new(AppState::new(db));

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
