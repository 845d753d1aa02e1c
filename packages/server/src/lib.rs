#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for `RegionIQ` geofence catchment analysis.
//!
//! Builds circle geofences, validates drawn polygons, and computes
//! area-weighted catchment aggregates against the LAD and MSOA boundary
//! sets. Boundaries are loaded lazily per level and cached for the
//! process lifetime; the levels named in `REGIONIQ_PRELOAD_LEVELS` are
//! warmed in the background at startup.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use regioniq_boundaries::{BoundaryCache, RegistrySource};
use regioniq_catchment::CatchmentEngine;
use regioniq_geofence_models::Level;
use regioniq_metrics::{DataApiMetricStore, InMemoryMetricStore, MetricStore};

/// Levels preloaded when `REGIONIQ_PRELOAD_LEVELS` is unset.
pub const DEFAULT_PRELOAD_LEVELS: &str = "LAD,MSOA";

/// Shared application state.
pub struct AppState {
    /// Catchment engine over the process-wide boundary cache.
    pub engine: CatchmentEngine,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/geofence/circle", web::post().to(handlers::circle))
            .route("/geofence/validate", web::post().to(handlers::validate))
            .route("/geofence/calculate", web::post().to(handlers::calculate))
            .route(
                "/boundaries/{level}/preload",
                web::post().to(handlers::preload),
            ),
    );
}

/// Parses a comma-separated level list, skipping unknown entries.
#[must_use]
pub fn parse_levels(value: &str) -> Vec<Level> {
    let mut levels = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.parse::<Level>() {
            Ok(level) if !levels.contains(&level) => levels.push(level),
            Ok(_) => {}
            Err(_) => log::warn!("Ignoring unknown preload level '{item}'"),
        }
    }
    levels
}

fn metric_store_from_env() -> Arc<dyn MetricStore> {
    match DataApiMetricStore::from_env() {
        Ok(store) => {
            log::info!("Reading metrics from the RegionIQ Data API");
            Arc::new(store)
        }
        Err(e) => {
            log::warn!("{e}; serving metrics from an empty in-memory store");
            Arc::new(InMemoryMetricStore::new())
        }
    }
}

/// Starts the catchment API server.
///
/// Configures the boundary cache and metric store from the environment,
/// starts background preloads, and runs the Actix-Web HTTP server. The
/// caller provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cache = Arc::new(BoundaryCache::new(Arc::new(RegistrySource::from_env())));
    let preload = std::env::var("REGIONIQ_PRELOAD_LEVELS")
        .unwrap_or_else(|_| DEFAULT_PRELOAD_LEVELS.to_string());
    for level in parse_levels(&preload) {
        log::info!("Preloading {level} boundaries in the background");
        cache.preload(level);
    }

    let state = web::Data::new(AppState {
        engine: CatchmentEngine::new(cache, metric_store_from_env()),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
