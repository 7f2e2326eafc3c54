use std::collections::BTreeMap;
use std::sync::Mutex;
use anyhow::{Error, Result};
use log::error;
use ndarray::Array4;
use opencv::core::{Mat, Rect, Size};
use opencv::imgproc::{resize, INTER_LINEAR};
use opencv::prelude::*;
use ort::session::Session;
use ort::value::Value;
use crate::pipeline::model_config::config::{match_emotion_class, EmotionClass};
use crate::pipeline::utils::utils::argmax;

/// A loaded classifier: takes a `[1, H, W, 1]` batch, returns one score per class.
pub trait EmotionModel: Send + Sync {
    fn predict(&self, input: Array4<f32>) -> Result<Vec<f32>>;
}

pub struct OnnxEmotionClassifier {
    session: Mutex<Session>,
}

impl OnnxEmotionClassifier {
    pub fn new(model_path: &str) -> Result<Self, Error> {
        let session = match Session::builder()?.commit_from_file(model_path) {
            Ok(session) => session,
            Err(e) => {
                error!("failed to load emotion model [{model_path}]: {e}");
                return Err(Error::from(e))
            }
        };

        Ok(OnnxEmotionClassifier {
            session: Mutex::new(session),
        })
    }
}

impl EmotionModel for OnnxEmotionClassifier {
    fn predict(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let input_tensor = Value::from_array(input)?;
        let mut session = self.session
            .lock()
            .map_err(|_| Error::msg("emotion_classification - session lock poisoned"))?;

        let outputs = session.run(ort::inputs![input_tensor])?;
        let (_, output_value) = outputs
            .iter()
            .next()
            .ok_or_else(|| Error::msg("emotion_classification - model returned no output"))?;

        let (_, scores) = output_value.try_extract_tensor::<f32>()?;
        let scores = scores.to_vec();
        Ok(scores)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmotionPrediction {
    pub emotion: EmotionClass,
    pub confidence: f64,
    pub all_scores: BTreeMap<EmotionClass, f64>,
}

pub struct EmotionClassification {
    model: Box<dyn EmotionModel>,
    image_size: (i32, i32),
    pixel_scale: f32,
    num_classes: usize,
}

impl EmotionClassification {
    pub fn new(
        model: Box<dyn EmotionModel>,
        image_size: (i32, i32),
        pixel_scale: f32,
        num_classes: usize,
    ) -> Self {
        EmotionClassification {
            model,
            image_size,
            pixel_scale,
            num_classes,
        }
    }

    fn _preprocess(&self, gray: &Mat, face: Rect) -> Result<Array4<f32>> {
        let roi = Mat::roi(gray, face)?.try_clone()?;

        let mut resized_face = Mat::default();
        resize(&roi, &mut resized_face, Size::new(self.image_size.0, self.image_size.1), 0.0, 0.0, INTER_LINEAR)?;

        let pixels = resized_face.data_bytes()?;
        let normalized: Vec<f32> = pixels.iter().map(|&p| p as f32 / self.pixel_scale).collect();

        let input = Array4::from_shape_vec(
            (1, self.image_size.1 as usize, self.image_size.0 as usize, 1),
            normalized,
        )?;
        Ok(input)
    }

    fn _postprocess(&self, scores: &[f32]) -> Result<EmotionPrediction> {
        if scores.len() != self.num_classes {
            return Err(Error::msg(format!(
                "emotion_classification - expected {} scores, model returned {}",
                self.num_classes,
                scores.len()
            )))
        }

        let max_index = argmax(scores)
            .ok_or_else(|| Error::msg("emotion_classification - model returned no valid scores"))?;
        let emotion = match_emotion_class(max_index)
            .ok_or_else(|| Error::msg(format!("emotion_classification - unknown class index {max_index}")))?;

        let all_scores = EmotionClass::ALL
            .iter()
            .zip(scores.iter())
            .map(|(class, score)| (*class, f64::from(*score)))
            .collect();

        // widened so the JSON carries the full f64 expansion of each score
        Ok(EmotionPrediction {
            emotion,
            confidence: f64::from(scores[max_index]),
            all_scores,
        })
    }

    /// Crops `face` out of `gray` and classifies it.
    pub fn call(&self, gray: &Mat, face: Rect) -> Result<EmotionPrediction> {
        let input = self._preprocess(gray, face)?;
        let scores = self.model.predict(input)?;
        self._postprocess(&scores)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use opencv::core::{Scalar, CV_8UC1};
    use crate::pipeline::model_config::config::EmotionClassificationConfig;
    use super::*;

    struct StaticModel {
        scores: Vec<f32>,
        inputs: Mutex<Vec<Array4<f32>>>,
    }

    impl EmotionModel for Arc<StaticModel> {
        fn predict(&self, input: Array4<f32>) -> Result<Vec<f32>> {
            self.inputs.lock().unwrap().push(input);
            Ok(self.scores.clone())
        }
    }

    fn classification(scores: Vec<f32>) -> (EmotionClassification, Arc<StaticModel>) {
        let model = Arc::new(StaticModel { scores, inputs: Mutex::new(vec![]) });
        let cfg = EmotionClassificationConfig::new();
        (EmotionClassification::new(Box::new(Arc::clone(&model)), cfg.image_size, cfg.pixel_scale, cfg.num_classes), model)
    }

    #[test]
    fn test_call_preprocesses_and_picks_max() {
        let (classification, model) = classification(vec![0.05, 0.05, 0.1, 0.6, 0.1, 0.05, 0.05]);
        let gray = Mat::new_rows_cols_with_default(100, 100, CV_8UC1, Scalar::all(51.0)).unwrap();

        let prediction = classification.call(&gray, Rect::new(10, 20, 30, 40)).unwrap();

        assert_eq!(prediction.emotion, EmotionClass::Happy);
        assert_eq!(prediction.confidence, f64::from(0.6f32));
        assert_eq!(prediction.all_scores.len(), 7);
        assert_eq!(prediction.all_scores[&EmotionClass::Happy], f64::from(0.6f32));

        let inputs = model.inputs.lock().unwrap();
        assert_eq!(inputs[0].shape(), &[1, 48, 48, 1]);
        assert!(inputs[0].iter().all(|v| (*v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_raw_scores_are_not_normalized() {
        let (classification, _) = classification(vec![2.0, -1.0, 7.5, 0.0, 3.0, 1.0, 7.5]);
        let gray = Mat::new_rows_cols_with_default(64, 64, CV_8UC1, Scalar::all(0.0)).unwrap();

        let prediction = classification.call(&gray, Rect::new(0, 0, 64, 64)).unwrap();

        assert_eq!(prediction.emotion, EmotionClass::Fearful);
        assert_eq!(prediction.confidence, 7.5);
    }

    #[test]
    fn test_wrong_score_count() {
        let (classification, _) = classification(vec![0.5, 0.5]);
        let gray = Mat::new_rows_cols_with_default(64, 64, CV_8UC1, Scalar::all(0.0)).unwrap();

        let err = classification.call(&gray, Rect::new(0, 0, 32, 32)).unwrap_err();
        assert!(err.to_string().contains("expected 7 scores"));
    }

    #[test]
    fn test_face_outside_image() {
        let (classification, model) = classification(vec![0.0; 7]);
        let gray = Mat::new_rows_cols_with_default(64, 64, CV_8UC1, Scalar::all(0.0)).unwrap();

        assert!(classification.call(&gray, Rect::new(50, 50, 40, 40)).is_err());
        assert!(model.inputs.lock().unwrap().is_empty());
    }
}
