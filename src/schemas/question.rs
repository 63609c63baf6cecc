use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SCHEMA_VERSION: u32 = 1;

const DEFAULT_QUESTION_NAME: &str = "Question";

/// Typed question payload. Incoming JSON is decoded once at this boundary;
/// the rest of the crate never re-interprets raw maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPayload {
    #[serde(default = "default_schema")]
    pub schema: u32,
    #[serde(default, rename = "question_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub points_possible: f64,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "question_type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        #[serde(default)]
        answers: Vec<Answer>,
    },
    ShortAnswer {
        #[serde(default)]
        answers: Vec<Answer>,
    },
    FillInMultipleBlanks {
        #[serde(default)]
        answers: Vec<Answer>,
    },
    Essay,
    TextOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// Regrade directive embedded in a question save. An empty strategy is
/// treated as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct RegradeDirective {
    pub strategy: String,
    pub acting_user: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSave {
    pub payload: QuestionPayload,
    pub directive: Option<RegradeDirective>,
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed question payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported payload schema version {0}")]
    UnsupportedSchema(u32),
}

impl QuestionPayload {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => DEFAULT_QUESTION_NAME,
        }
    }

    pub fn is_text_only(&self) -> bool {
        matches!(self.kind, QuestionKind::TextOnly)
    }

    /// Answer-bank question types drop answers with blank text before the
    /// payload is persisted.
    pub fn filter_blank_answers(&mut self) {
        match &mut self.kind {
            QuestionKind::ShortAnswer { answers }
            | QuestionKind::FillInMultipleBlanks { answers } => {
                answers.retain(|answer| !answer.text.trim().is_empty());
            }
            QuestionKind::MultipleChoice { .. } | QuestionKind::Essay | QuestionKind::TextOnly => {}
        }
    }
}

/// Decodes a raw question save, splitting off the regrade directive keys
/// before the typed payload decode.
pub fn decode_save(mut value: serde_json::Value) -> Result<QuestionSave, PayloadError> {
    let directive = extract_directive(&mut value);

    let payload: QuestionPayload = serde_json::from_value(value)?;
    if payload.schema != SCHEMA_VERSION {
        return Err(PayloadError::UnsupportedSchema(payload.schema));
    }

    Ok(QuestionSave { payload, directive })
}

fn extract_directive(value: &mut serde_json::Value) -> Option<RegradeDirective> {
    let object = value.as_object_mut()?;
    let strategy = match object.remove("regrade_option") {
        Some(serde_json::Value::String(raw)) => raw,
        _ => return None,
    };
    let acting_user = match object.remove("regrade_user") {
        Some(serde_json::Value::String(user)) if !user.trim().is_empty() => Some(user),
        _ => None,
    };

    if strategy.trim().is_empty() {
        return None;
    }

    Some(RegradeDirective { strategy, acting_user })
}

fn default_schema() -> u32 {
    SCHEMA_VERSION
}
