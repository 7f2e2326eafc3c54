use std::sync::Arc;
use log::{error, info};
use opentelemetry::{global, Context};
use opentelemetry::trace::{Span, Status, Tracer};
use crate::error::errors::Error;
use crate::models::emotion_model::{PredictionInput, PredictionOutput};
use crate::pipeline::emotion_pipeline::emotion_pipeline::EmotionPipeline;
use crate::pipeline::utils::image::byte_data_to_opencv;
use crate::tracer::tracer::TRACER_NAME;

#[derive(Clone)]
pub struct EmotionService {
    emotion_pipeline: Arc<EmotionPipeline>
}

impl EmotionService {
    pub fn new(emotion_pipeline: &Arc<EmotionPipeline>) -> Self {
        EmotionService {
            emotion_pipeline: Arc::clone(emotion_pipeline),
        }
    }

    /// Decodes the upload and runs the pipeline on a blocking worker. The
    /// decode and detect spans are recorded under `request_ctx`.
    pub async fn predict_emotion(&self, input: PredictionInput, request_ctx: &Context) -> Result<PredictionOutput, Error> {
        let pipeline = Arc::clone(&self.emotion_pipeline);
        let PredictionInput { im_bytes, file_name } = input;
        info!("decoding {} ({} bytes)", file_name, im_bytes.len());

        let request_ctx = request_ctx.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let tracer = global::tracer(TRACER_NAME);

            let mut child = tracer.start_with_context("decode-image", &request_ctx);
            let image = match byte_data_to_opencv(&im_bytes) {
                Ok(image) => image,
                Err(e) => {
                    error!("failed to decode image: {e}");
                    child.set_status(Status::error(e.to_string()));
                    child.end();
                    return Err(Error::image_decode(e.to_string()))
                }
            };
            drop(im_bytes);
            child.end();

            let mut child = tracer.start_with_context("detect-emotion", &request_ctx);
            let result = pipeline.detect(&image).map_err(Error::from);
            child.end();
            result
        });

        let emotion = match handle.await {
            Ok(result) => result?,
            Err(e) => {
                error!("emotion worker failed: {e}");
                return Err(Error::Server(anyhow::Error::from(e)))
            }
        };

        Ok(PredictionOutput { emotion })
    }
}
