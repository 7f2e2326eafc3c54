pub mod face_detection;
pub mod emotion_classification;
