use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use log::error;
use serde_json::json;


#[derive(thiserror::Error, Debug)]
pub enum Error {

    #[error("{0}")]
    BadRequest(#[from] BadRequestError),

    #[error("No route for {0}")]
    NotFound(String),

    #[error("{0}")]
    ImageDecode(String),

    #[error("{0}")]
    Server(#[from] anyhow::Error),
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            // 4XX Errors
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,

            // 5XX Errors
            Error::ImageDecode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn image_decode(message: impl Into<String>) -> Self {
        Error::ImageDecode(message.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let message = self.to_string();
        if status_code.is_server_error() {
            error!("request failed: {message}");
        }
        let body = Json(json!({ "error": message }));

        (status_code, body).into_response()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BadRequestError {
    #[error("No file part")]
    MissingFilePart,
    #[error("No selected file")]
    EmptyFileName,
    #[error("{0}")]
    Multipart(String),
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request_mapping() {
        let response = Error::from(BadRequestError::MissingFilePart).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "No file part" }));

        let response = Error::from(BadRequestError::EmptyFileName).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "No selected file" }));
    }

    #[tokio::test]
    async fn test_server_error_mapping() {
        let response = Error::image_decode("cannot identify image file").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "cannot identify image file" }));

        let response = Error::from(anyhow::anyhow!("inference failed")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "inference failed" }));
    }

    #[tokio::test]
    async fn test_not_found_mapping() {
        let response = Error::NotFound("/nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({ "error": "No route for /nope" }));
    }
}
