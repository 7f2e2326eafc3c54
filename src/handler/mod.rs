pub mod emotion_handler;
