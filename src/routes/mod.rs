pub mod root;
pub mod predict;
