use std::sync::Arc;

use axum::{middleware, Router};
use axum::http::header;
use axum::response::Html;
use axum::routing::get;
use http::{Method, StatusCode, Uri};
use serde_json::{json, Value};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::propagate_header::PropagateHeaderLayer;
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use crate::error::errors::Error;
use crate::middleware::request_id_mw::{generate_request_id_mw, REQUEST_ID_HEADER};
use crate::pipeline::emotion_pipeline::emotion_pipeline::EmotionPipeline;
use crate::response::common_response::{GeneralResponseBuilder, GeneralResponseResult};
use crate::routes::predict::new_predict_route;
use crate::state::emotion_state::EmotionState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Clone)]
pub struct RouterState {
    emotion_pipeline: Arc<EmotionPipeline>,
    max_body_size: usize,
}

impl RouterState {
    pub fn new(emotion_pipeline: EmotionPipeline, max_body_size: usize) -> Self {
        RouterState {
            emotion_pipeline: Arc::new(emotion_pipeline),
            max_body_size,
        }
    }
}

pub fn root_routes(router_state: RouterState) -> Router {

    let emotion_state = EmotionState::new(&router_state.emotion_pipeline);
    let predict_route = new_predict_route(router_state.max_body_size)
        .with_state(emotion_state);

    Router::new()
        .route("/", get(index))
        .route("/health", get(healthcheck))
        .merge(predict_route)
        .fallback(fallback)
        .layer(CompressionLayer::new())
        .layer(PropagateHeaderLayer::new(header::HeaderName::from_static(REQUEST_ID_HEADER)))
        .layer(CorsLayer::permissive().allow_methods([Method::GET, Method::POST, Method::HEAD, Method::OPTIONS]))
        .layer(middleware::from_fn(generate_request_id_mw))
        .layer(SetSensitiveHeadersLayer::new(std::iter::once(header::AUTHORIZATION)))
}

async fn fallback(uri: Uri) -> Error {
    Error::NotFound(uri.to_string())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthcheck() -> GeneralResponseResult<Value> {
    Ok(GeneralResponseBuilder::new()
        .status_code(StatusCode::OK)
        .body(json!({ "status": "OK" }))
        .build())
}
