pub mod emotion_service;
