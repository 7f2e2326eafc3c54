use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::debug_handler;
use bytes::Bytes;
use ecs_logger::extra_fields;
use http::{HeaderMap, StatusCode};
use log::{info, warn};
use opentelemetry::global;
use opentelemetry::trace::{Span, Status, TraceContextExt, Tracer};
use crate::error::errors::{BadRequestError, Error};
use crate::logger::logger::LoggerExtraFields;
use crate::middleware::request_id_mw::REQUEST_ID_HEADER;
use crate::models::emotion_model::{PredictionInput, PredictionOutput};
use crate::response::common_response::{GeneralResponseBuilder, GeneralResponseResult};
use crate::state::emotion_state::EmotionState;
use crate::tracer::tracer::TRACER_NAME;

const FILE_FIELD: &str = "file";

/// A request that is not a multipart form at all carries no file part.
fn multipart_rejection(rejection: MultipartRejection) -> Error {
    match rejection {
        MultipartRejection::InvalidBoundary(_) => BadRequestError::MissingFilePart.into(),
        other => BadRequestError::Multipart(other.body_text()).into(),
    }
}

/// Pulls the first `file` part that carries a filename out of the form.
/// A part without a filename parameter is a plain form value, not a file.
async fn read_upload(payload: Result<Multipart, MultipartRejection>) -> Result<PredictionInput, Error> {
    let mut payload = payload.map_err(multipart_rejection)?;
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = payload
        .next_field()
        .await
        .map_err(|e| BadRequestError::Multipart(e.body_text()))?
    {
        if upload.is_some() || field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| BadRequestError::Multipart(e.body_text()))?;
        upload = Some((file_name, data));
    }

    match upload {
        None => Err(BadRequestError::MissingFilePart.into()),
        Some((file_name, _)) if file_name.is_empty() => Err(BadRequestError::EmptyFileName.into()),
        Some((file_name, im_bytes)) => Ok(PredictionInput { im_bytes, file_name }),
    }
}

#[debug_handler(state=EmotionState)]
pub async fn predict(headers: HeaderMap, State(state): State<EmotionState>, payload: Result<Multipart, MultipartRejection>) -> GeneralResponseResult<PredictionOutput> {
    let tracer = global::tracer(TRACER_NAME);
    let parent_ctx = opentelemetry::Context::new();
    let span = tracer
        .span_builder("emotion-prediction")
        .start_with_context(&tracer, &parent_ctx);
    let request_ctx = parent_ctx.with_span(span);

    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if let Err(e) = extra_fields::set_extra_fields(LoggerExtraFields { request_id }) {
        warn!("failed to attach request id to logs: {e}");
    }
    info!("received emotion prediction request");

    let mut child = tracer.start_with_context("read-upload", &request_ctx);
    let upload = read_upload(payload).await;
    child.end();

    let result = match upload {
        Ok(input) => state.emotion_service.predict_emotion(input, &request_ctx).await,
        Err(e) => {
            warn!("rejected upload: {e}");
            Err(e)
        }
    };

    let span = request_ctx.span();
    if let Err(e) = &result {
        span.set_status(Status::error(e.to_string()));
    }
    span.end();

    let response = result.map(|output| {
        info!("completed emotion prediction");
        GeneralResponseBuilder::new()
            .status_code(StatusCode::OK)
            .body(output)
            .build()
    });

    extra_fields::clear_extra_fields();
    response
}
