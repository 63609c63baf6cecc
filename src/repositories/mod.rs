pub mod questions;
pub mod quizzes;
pub mod regrades;
