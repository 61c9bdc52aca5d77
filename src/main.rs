mod analytics;
mod auth;
mod config;
mod database;
mod error;
mod lifecycle;
mod live;
mod models;
mod notifications;
mod registry;
mod routes;
mod schema;
mod storage;
mod structs;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prom::PrometheusMetricsBuilder;
use clap::Parser;
use log::{error, info, warn};

use analytics::Analytics;
use auth::{AuthService, TokenAuthority};
use config::Config;
use database::PostgresDatabase;
use lifecycle::Lifecycle;
use live::EventHub;
use notifications::NotificationFeed;
use registry::Registry;
use routes::AppState;
use storage::{MemoryStorage, Storage};
use structs::Args;

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn open_storage(config: &Config) -> Arc<dyn Storage> {
    if config.offline {
        warn!("Running offline, nothing will survive a restart");
        return Arc::new(MemoryStorage::new());
    }

    match PostgresDatabase::connect(&config.postgres_url) {
        Ok(database) => Arc::new(database),
        Err(e) => {
            error!("Cannot reach postgres: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_state(config: &Config, storage: Arc<dyn Storage>) -> AppState {
    let hub = Arc::new(EventHub::new());
    let feed = Arc::new(NotificationFeed::new(storage.clone()));
    let tokens = TokenAuthority::new(&config.jwt_secret, config.jwt_expire_days);

    AppState {
        auth: Arc::new(AuthService::new(storage.clone(), tokens)),
        lifecycle: Arc::new(Lifecycle::new(storage.clone(), feed.clone(), hub.clone())),
        analytics: Arc::new(Analytics::new(storage.clone())),
        registry: Arc::new(Registry::new(storage.clone())),
        feed,
        hub,
        storage,
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("Starting transport office ... ");
    let config = Config::load(&args);
    let state = build_state(&config, open_storage(&config));

    if let Some((email, password)) = &config.bootstrap_admin {
        if let Err(e) = state.auth.bootstrap_admin(email, password) {
            error!("Could not create the first administrator: {}", e);
        }
    }

    let prometheus = PrometheusMetricsBuilder::new("api")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let host = config.host.clone();
    let port = config.port;
    let origins = config.cors_origins.clone();
    info!("Listening on: {}:{}", host, port);

    HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(prometheus.clone())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::from(state.auth.clone()))
            .configure(routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
