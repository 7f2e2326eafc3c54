use bytes::Bytes;
use serde::Serialize;
use crate::pipeline::emotion_pipeline::emotion_pipeline::EmotionDetectionResult;


#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutput {
    pub emotion: EmotionDetectionResult,
}

#[derive(Clone)]
pub struct PredictionInput {
    pub im_bytes: Bytes,
    pub file_name: String,
}
