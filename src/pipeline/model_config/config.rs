use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EmotionClass {
    Angry = 0,
    Disgusted = 1,
    Fearful = 2,
    Happy = 3,
    Neutral = 4,
    Sad = 5,
    Surprised = 6,
}

impl EmotionClass {
    pub const ALL: [EmotionClass; 7] = [
        EmotionClass::Angry,
        EmotionClass::Disgusted,
        EmotionClass::Fearful,
        EmotionClass::Happy,
        EmotionClass::Neutral,
        EmotionClass::Sad,
        EmotionClass::Surprised,
    ];
}

pub fn match_emotion_class(idx: usize) -> Option<EmotionClass> {
    EmotionClass::ALL.get(idx).copied()
}

/// One rung of the cascade fallback ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
    pub min_size: (i32, i32),
}

#[derive(Debug)]
pub struct FaceDetectionConfig {
    pub detection_ladder: Vec<DetectionParams>,
}

impl FaceDetectionConfig {
    pub fn new() -> Self {
        FaceDetectionConfig {
            // Most strict first, stop at the first rung with a hit.
            detection_ladder: vec![
                DetectionParams { scale_factor: 1.1, min_neighbors: 5, min_size: (30, 30) },
                DetectionParams { scale_factor: 1.2, min_neighbors: 4, min_size: (25, 25) },
                DetectionParams { scale_factor: 1.3, min_neighbors: 3, min_size: (20, 20) },
            ],
        }
    }
}

#[derive(Debug)]
pub struct EmotionClassificationConfig {
    pub image_size: (i32, i32),
    pub pixel_scale: f32,
    pub num_classes: usize,
}

impl EmotionClassificationConfig {
    pub fn new() -> Self {
        EmotionClassificationConfig {
            image_size: (48, 48),
            pixel_scale: 255.0,
            num_classes: EmotionClass::ALL.len(),
        }
    }
}
