use serde::{Deserialize, Serialize};
use sqlx::Type;

/// How previously submitted answers to a changed question should be rescored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "regradestrategy", rename_all = "snake_case")]
pub enum RegradeStrategy {
    FullCredit,
    CurrentCorrectOnly,
    UpdateScores,
    NoRegrade,
    Disregard,
}

impl RegradeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            RegradeStrategy::FullCredit => "full_credit",
            RegradeStrategy::CurrentCorrectOnly => "current_correct_only",
            RegradeStrategy::UpdateScores => "update_scores",
            RegradeStrategy::NoRegrade => "no_regrade",
            RegradeStrategy::Disregard => "disregard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full_credit" => Some(RegradeStrategy::FullCredit),
            "current_correct_only" => Some(RegradeStrategy::CurrentCorrectOnly),
            "update_scores" => Some(RegradeStrategy::UpdateScores),
            "no_regrade" => Some(RegradeStrategy::NoRegrade),
            "disregard" => Some(RegradeStrategy::Disregard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "questionstate", rename_all = "lowercase")]
pub enum QuestionState {
    Active,
    Deleted,
}
