//! HTTP inbound adapter.
//!
//! JSON API over [`VideoService`] plus static serving of processed videos.

mod error;
pub mod handlers;
pub mod upload;

use crate::adapters::local::fs::OUTPUTS_ROUTE;
use crate::application::service::VideoService;
use crate::ports::repository::VideoRecordRepository;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub fn router<R>(service: VideoService<R>, cors_allow_origins: &[String]) -> Router
where
    R: VideoRecordRepository + 'static,
{
    let outputs = ServeDir::new(service.files().output_dir());

    Router::new()
        .route("/upload-video", post(handlers::upload_video::<R>))
        .route("/api/jobs/:job_id", get(handlers::get_job::<R>))
        .route(
            "/api/videos/:video_id",
            get(handlers::get_video::<R>).delete(handlers::delete_video::<R>),
        )
        .route("/api/analytics", get(handlers::get_analytics::<R>))
        .route("/api/analytics/report", get(handlers::download_report::<R>))
        .nest_service(OUTPUTS_ROUTE, outputs)
        .layer(DefaultBodyLimit::disable())
        .layer(cors(cors_allow_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
