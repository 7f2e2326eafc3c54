pub mod emotion_pipeline;
