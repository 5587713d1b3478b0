pub mod answers;
pub mod questions;
pub mod sessions;
