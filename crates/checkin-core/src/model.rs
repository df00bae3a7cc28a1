//! Records shared by storage and pages, plus their text limits.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Row id of any stored record.
pub type Id = i64;

/// Longest accepted user name, in characters.
pub const MAX_NAME_LEN: usize = 100;
/// Longest accepted login slug.
pub const MAX_SLUG_LEN: usize = 50;
/// Longest accepted question text.
pub const MAX_QUESTION_LEN: usize = 255;

/// A person taking part in the weekly check-ins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Row id.
    pub id: Id,
    /// Display name, e.g. "Mina".
    pub name: String,
    /// Login handle, unique across users.
    pub slug: String,
    /// PHC-format password hash; never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// How a question is answered.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Numeric answer on a 1–10 scale; charted on the dashboard.
    Scale,
    /// Free text.
    #[default]
    Text,
}

impl QuestionKind {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Scale => "scale",
            QuestionKind::Text => "text",
        }
    }

    /// Form input parsing: anything that is not `scale` is a text question.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim().parse().unwrap_or_default()
    }
}

impl FromStr for QuestionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scale" => Ok(QuestionKind::Scale),
            "text" => Ok(QuestionKind::Text),
            other => Err(CoreError::UnknownQuestionKind(other.to_string())),
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question asked every week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    /// Row id; also fixes the display order.
    pub id: Id,
    /// Question as shown on the form.
    pub text: String,
    /// Input type of the answer.
    pub kind: QuestionKind,
}

/// One submitted weekly check-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckIn {
    /// Row id.
    pub id: Id,
    /// Author of the check-in.
    pub user_id: Id,
    /// Monday of the week the check-in belongs to.
    pub week_start: NaiveDate,
}

/// Answer to one question within a check-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    /// Row id.
    pub id: Id,
    /// Check-in the answer belongs to.
    pub checkin_id: Id,
    /// Question being answered.
    pub question_id: Id,
    /// Trimmed answer text, as entered.
    pub value: String,
}

/// A check-in together with its answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckInWithAnswers {
    /// The check-in row.
    pub checkin: CheckIn,
    /// Its answers in question order.
    pub answers: Vec<Answer>,
}

impl CheckInWithAnswers {
    /// Answer given to `question_id`, if any.
    pub fn answer_for(&self, question_id: Id) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    /// question id -> answer value, used to prefill the next check-in form.
    pub fn answer_map(&self) -> BTreeMap<Id, String> {
        self.answers
            .iter()
            .map(|a| (a.question_id, a.value.clone()))
            .collect()
    }
}

/// Category of a one-shot page message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    /// Something was saved.
    Success,
    /// Something was rejected.
    Danger,
    /// Neutral notice.
    Info,
}

impl FlashKind {
    /// CSS class suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Danger => "danger",
            FlashKind::Info => "info",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    /// Styling category.
    pub kind: FlashKind,
    /// Text shown to the user.
    pub message: String,
}

impl Flash {
    /// A success message.
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: FlashKind::Success, message: message.into() }
    }

    /// An error message.
    pub fn danger(message: impl Into<String>) -> Self {
        Self { kind: FlashKind::Danger, message: message.into() }
    }

    /// An informational message.
    pub fn info(message: impl Into<String>) -> Self {
        Self { kind: FlashKind::Info, message: message.into() }
    }
}

/// Validates a new user's name and slug against the column limits.
pub fn validate_user(name: &str, slug: &str) -> Result<(), CoreError> {
    check_text("name", name, MAX_NAME_LEN)?;
    check_text("slug", slug, MAX_SLUG_LEN)
}

/// Validates question text against the column limit.
pub fn validate_question(text: &str) -> Result<(), CoreError> {
    check_text("question text", text, MAX_QUESTION_LEN)
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Empty(field));
    }
    if value.chars().count() > max {
        return Err(CoreError::TooLong { field, max });
    }
    Ok(())
}
