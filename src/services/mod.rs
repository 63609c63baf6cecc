pub mod question_writer;
pub mod regrade_tracker;
