use axum::extract::DefaultBodyLimit;
use axum::Router;
use axum::routing::post;
use crate::state::emotion_state::EmotionState;
use tower_http::limit::RequestBodyLimitLayer;
use crate::handler::emotion_handler::predict;

pub fn new_predict_route(max_body_size: usize) -> Router<EmotionState> {

    let router = Router::new()
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size));
    router
}
