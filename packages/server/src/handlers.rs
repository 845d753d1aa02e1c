//! HTTP handler functions for the catchment API.

use actix_web::{HttpResponse, web};
use regioniq_catchment::CatchmentError;
use regioniq_geofence::{
    GeofenceError, create_circle_polygon, create_geofence, validate_geofence_polygon,
};
use regioniq_geofence_models::{GeofenceMode, Level, ValidationError};
use regioniq_server_models::{
    ApiError, ApiGeofenceResult, ApiHealth, ApiPreload, CalculateRequest, CircleRequest,
    ValidateRequest,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/geofence/circle`
///
/// Builds a 64-vertex geodesic circle geofence.
pub async fn circle(body: web::Json<CircleRequest>) -> HttpResponse {
    let geofence = create_circle_polygon(body.center, body.radius_km)
        .and_then(|geometry| create_geofence(geometry, GeofenceMode::Circle));

    match geofence {
        Ok(geofence) => HttpResponse::Ok().json(geofence),
        Err(GeofenceError::Validation(e)) => invalid_geofence(&e),
        Err(e) => {
            log::error!("Failed to build circle geofence: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("GEOMETRY_ERROR", e.to_string()))
        }
    }
}

/// `POST /api/geofence/validate`
pub async fn validate(body: web::Json<ValidateRequest>) -> HttpResponse {
    HttpResponse::Ok().json(validate_geofence_polygon(&body.geometry))
}

/// `POST /api/geofence/calculate`
///
/// Rebuilds the geofence from its geometry, so circle parameters sent by
/// the client are ignored, then returns area-weighted aggregates for the
/// requested year, scenario, and level.
pub async fn calculate(
    state: web::Data<AppState>,
    body: web::Json<CalculateRequest>,
) -> HttpResponse {
    let geofence = match create_geofence(body.geofence.geometry.clone(), body.geofence.mode()) {
        Ok(geofence) => geofence,
        Err(GeofenceError::Validation(e)) => return invalid_geofence(&e),
        Err(e) => {
            log::error!("Failed to rebuild geofence: {e}");
            return HttpResponse::InternalServerError()
                .json(ApiError::new("GEOMETRY_ERROR", e.to_string()));
        }
    };

    let params = body.params();
    match state.engine.calculate(&geofence, &params).await {
        Ok(result) => HttpResponse::Ok().json(ApiGeofenceResult::from(result)),
        Err(e) => {
            log::error!("Failed to calculate {} catchment: {e}", params.level);
            let code = match e {
                CatchmentError::Boundary(_) => "BOUNDARIES_UNAVAILABLE",
                CatchmentError::Metric(_) => "METRICS_UNAVAILABLE",
            };
            HttpResponse::BadGateway().json(ApiError::new(code, e.to_string()))
        }
    }
}

/// `POST /api/boundaries/{level}/preload`
///
/// Starts loading a level in the background and returns immediately.
pub async fn preload(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let Ok(level) = path.parse::<Level>() else {
        return HttpResponse::BadRequest().json(ApiError::new(
            "UNKNOWN_LEVEL",
            format!("Unknown boundary level '{path}'"),
        ));
    };

    let cache = state.engine.boundaries();
    let already_loaded = cache.is_loaded(level).await;
    if !already_loaded {
        cache.preload(level);
    }

    HttpResponse::Accepted().json(ApiPreload {
        level,
        already_loaded,
    })
}

fn invalid_geofence(error: &ValidationError) -> HttpResponse {
    let details = serde_json::to_value(error).unwrap_or_default();
    HttpResponse::BadRequest()
        .json(ApiError::new("INVALID_GEOFENCE", error.to_string()).with_details(details))
}
