pub mod emotion_state;
