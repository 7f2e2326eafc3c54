use std::sync::Mutex;
use anyhow::{Error, Result};
use log::{debug, error};
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use crate::pipeline::model_config::config::DetectionParams;

/// Finds face rectangles in a grayscale image for one set of parameters.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, gray: &Mat, params: &DetectionParams) -> Result<Vec<Rect>>;
}

pub struct HaarCascadeDetection {
    classifier: Mutex<CascadeClassifier>,
}

impl HaarCascadeDetection {
    pub fn new(cascade_path: &str) -> Result<Self, Error> {
        let classifier = match CascadeClassifier::new(cascade_path) {
            Ok(classifier) => classifier,
            Err(e) => {
                error!("failed to load haar cascade [{cascade_path}]: {e}");
                return Err(Error::from(e))
            }
        };

        if classifier.empty()? {
            return Err(Error::msg(format!("face_detection - haar cascade [{cascade_path}] is empty")))
        }

        Ok(HaarCascadeDetection {
            classifier: Mutex::new(classifier),
        })
    }
}

impl FaceDetector for HaarCascadeDetection {
    fn detect(&self, gray: &Mat, params: &DetectionParams) -> Result<Vec<Rect>> {
        let mut faces = Vector::<Rect>::new();
        let mut classifier = self.classifier
            .lock()
            .map_err(|_| Error::msg("face_detection - cascade lock poisoned"))?;

        classifier.detect_multi_scale(
            gray,
            &mut faces,
            params.scale_factor,
            params.min_neighbors,
            0,
            Size::new(params.min_size.0, params.min_size.1),
            Size::new(0, 0),
        )?;
        debug!("cascade {:?} found {} faces", params, faces.len());

        Ok(faces.to_vec())
    }
}

/// Walks the ladder in order and returns the first non-empty detection.
pub fn detect_with_ladder(detector: &dyn FaceDetector, gray: &Mat, ladder: &[DetectionParams]) -> Result<Vec<Rect>> {
    for params in ladder {
        let faces = detector.detect(gray, params)?;
        if !faces.is_empty() {
            return Ok(faces)
        }
    }
    Ok(vec![])
}
