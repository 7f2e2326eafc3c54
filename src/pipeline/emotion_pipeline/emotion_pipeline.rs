use std::collections::BTreeMap;
use anyhow::Error;
use log::{debug, info, warn};
use opencv::core::{Mat, Rect};
use serde::Serialize;
use crate::pipeline::model_config::config::{DetectionParams, EmotionClass, EmotionClassificationConfig, FaceDetectionConfig};
use crate::pipeline::module::emotion_classification::{EmotionClassification, EmotionModel, OnnxEmotionClassifier};
use crate::pipeline::module::face_detection::{detect_with_ladder, FaceDetector, HaarCascadeDetection};
use crate::pipeline::utils::image::{equalize, is_valid_image, to_grayscale};
use crate::pipeline::utils::utils::rect_to_bbox;

pub const INVALID_IMAGE_INPUT: &str = "Invalid image input";
pub const NO_FACE_DETECTED: &str = "No face detected";

pub struct EmotionPipeline {
    face_detection: Box<dyn FaceDetector>,
    emotion_classification: EmotionClassification,
    detection_ladder: Vec<DetectionParams>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FaceEmotionResult {
    Classified {
        face_id: usize,
        bbox: [i32; 4],
        emotion: EmotionClass,
        confidence: f64,
        all_scores: BTreeMap<EmotionClass, f64>,
    },
    Failed {
        face_id: usize,
        bbox: [i32; 4],
        error: String,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum EmotionDetectionResult {
    InvalidInput { error: &'static str },
    NoFace { result: &'static str },
    Detected {
        num_faces_detected: usize,
        results: Vec<FaceEmotionResult>,
    },
}

impl EmotionDetectionResult {
    pub fn invalid_input() -> Self {
        EmotionDetectionResult::InvalidInput { error: INVALID_IMAGE_INPUT }
    }

    pub fn no_face() -> Self {
        EmotionDetectionResult::NoFace { result: NO_FACE_DETECTED }
    }
}

impl EmotionPipeline {
    pub fn new(cascade_path: &str, emotion_model_path: &str) -> Result<Self, Error> {
        let face_detection = HaarCascadeDetection::new(cascade_path)?;
        let emotion_model = OnnxEmotionClassifier::new(emotion_model_path)?;

        Ok(EmotionPipeline::with_models(Box::new(face_detection), Box::new(emotion_model)))
    }

    pub fn with_models(face_detector: Box<dyn FaceDetector>, emotion_model: Box<dyn EmotionModel>) -> Self {
        let face_detection_cfg = FaceDetectionConfig::new();
        let emotion_classification_cfg = EmotionClassificationConfig::new();

        let emotion_classification = EmotionClassification::new(
            emotion_model,
            emotion_classification_cfg.image_size,
            emotion_classification_cfg.pixel_scale,
            emotion_classification_cfg.num_classes,
        );

        EmotionPipeline {
            face_detection: face_detector,
            emotion_classification,
            detection_ladder: face_detection_cfg.detection_ladder,
        }
    }

    /// Returns the detected faces together with the image they were found in:
    /// the plain grayscale image, or its equalized copy when only the
    /// equalized sweep found something.
    fn _locate_faces(&self, gray: Mat) -> Result<Option<(Vec<Rect>, Mat)>, Error> {
        let faces = detect_with_ladder(self.face_detection.as_ref(), &gray, &self.detection_ladder)?;
        if !faces.is_empty() {
            return Ok(Some((faces, gray)))
        }

        debug!("no face in grayscale sweep, retrying on equalized histogram");
        let equalized_gray = equalize(&gray)?;
        let faces = detect_with_ladder(self.face_detection.as_ref(), &equalized_gray, &self.detection_ladder)?;
        if faces.is_empty() {
            return Ok(None)
        }

        Ok(Some((faces, equalized_gray)))
    }

    pub fn detect(&self, image: &Mat) -> Result<EmotionDetectionResult, Error> {
        if !is_valid_image(image) {
            return Ok(EmotionDetectionResult::invalid_input())
        }

        let gray = match to_grayscale(image)? {
            Some(gray) => gray,
            None => return Ok(EmotionDetectionResult::invalid_input()),
        };

        let (faces, crop_source) = match self._locate_faces(gray)? {
            Some(located) => located,
            None => {
                info!("no face detected");
                return Ok(EmotionDetectionResult::no_face())
            }
        };
        info!("detected {} faces", faces.len());

        let results = faces
            .iter()
            .enumerate()
            .map(|(i, face)| {
                let face_id = i + 1;
                let bbox = rect_to_bbox(face);
                match self.emotion_classification.call(&crop_source, *face) {
                    Ok(prediction) => FaceEmotionResult::Classified {
                        face_id,
                        bbox,
                        emotion: prediction.emotion,
                        confidence: prediction.confidence,
                        all_scores: prediction.all_scores,
                    },
                    Err(e) => {
                        warn!("failed to classify face {face_id}: {e}");
                        FaceEmotionResult::Failed {
                            face_id,
                            bbox,
                            error: e.to_string(),
                        }
                    }
                }
            })
            .collect::<Vec<_>>();

        Ok(EmotionDetectionResult::Detected {
            num_faces_detected: faces.len(),
            results,
        })
    }
}
