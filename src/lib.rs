pub mod core;
pub mod db;
pub mod repositories;
pub mod schemas;
pub mod services;
pub mod store;

pub use db::types::{QuestionState, RegradeStrategy};
pub use repositories::regrades::PgRegradeStore;
pub use services::question_writer::{QuestionSaveError, QuestionWriter, SaveQuestion};
pub use services::regrade_tracker::{RegradeError, RegradeRequest, RegradeTracker};
pub use store::{
    MemoryRegradeStore, QuizRef, RegradeOutcome, RegradeStore, RegradeUpsert, StoreError,
};
