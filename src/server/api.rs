use crate::aggregator::{ AggregationError, LastMessageAggregator };
use crate::models::api::{ LastMessagesRequest, LastMessagesResponse, PingResponse };
use axum::{
    body::Bytes,
    extract::{ Request, State },
    http::StatusCode,
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use governor::{ DefaultDirectRateLimiter, Quota, RateLimiter };
use log::{ error, info, warn };
use std::any::Any;
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{ self, CorsLayer };

pub const LAST_MESSAGES_PATH: &str = "/get-character-last-messages";
pub const PING_PATH: &str = "/ping-local";

#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<LastMessageAggregator>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl AppState {
    /// `rate_limit_per_second == 0` disables the request limiter.
    pub fn new(aggregator: LastMessageAggregator, rate_limit_per_second: u32) -> Self {
        let limiter = NonZeroU32::new(rate_limit_per_second).map(|per_second|
            Arc::new(RateLimiter::direct(Quota::per_second(per_second)))
        );
        if limiter.is_none() {
            warn!("Request rate limiting is disabled.");
        }
        Self { aggregator: Arc::new(aggregator), limiter }
    }
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route(PING_PATH, get(ping_handler))
        .route(LAST_MESSAGES_PATH, post(last_messages_handler));
    with_layers(routes, state)
}

/// Adds the JSON 404 fallback, rate limiting, panic recovery and CORS.
fn with_layers(routes: Router<AppState>, state: AppState) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    routes
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer)
        .with_state(state)
}

fn failure(code: StatusCode, message: &str) -> Response {
    (code, Json(LastMessagesResponse::error(message))).into_response()
}

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            warn!("Request rate limit exceeded for {}. Rejecting request.", request.uri().path());
            return failure(StatusCode::TOO_MANY_REQUESTS, "Too many requests.");
        }
    }
    next.run(request).await
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);
    failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
}

async fn ping_handler() -> impl IntoResponse {
    Json(PingResponse {
        success: true,
        message: "Local helper server is running.".into(),
    })
}

async fn last_messages_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        LastMessagesRequest::default()
    } else {
        match serde_json::from_slice::<LastMessagesRequest>(&body) {
            Ok(req) => req,
            Err(e) => {
                warn!("Rejecting malformed request body: {}", e);
                return failure(StatusCode::BAD_REQUEST, "Invalid JSON body.");
            }
        }
    };

    let avatar = request.character_avatar.unwrap_or_default();
    info!("Fetching last messages for avatar: {}", avatar);

    match state.aggregator.aggregate(&avatar).await {
        Ok(summaries) => {
            info!("Returning {} chat summaries for {}", summaries.len(), avatar);
            (StatusCode::OK, Json(LastMessagesResponse::ok(summaries))).into_response()
        }
        Err(AggregationError::MissingIdentifier) => {
            failure(StatusCode::BAD_REQUEST, "character_avatar is required.")
        }
        Err(e @ AggregationError::InvalidIdentifier(_)) => {
            warn!("{}", e);
            failure(StatusCode::BAD_REQUEST, "character_avatar is invalid.")
        }
        Err(e @ AggregationError::DirectoryRead { .. }) => {
            error!("{}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read character chat directory.")
        }
    }
}

async fn not_found_handler() -> Response {
    failure(StatusCode::NOT_FOUND, "Not found.")
}
