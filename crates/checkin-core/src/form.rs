//! Helpers for turning submitted form fields into answers.

use std::collections::HashMap;

use crate::model::{Id, Question};

/// Form field name carrying the answer to `question_id`.
pub fn answer_field(question_id: Id) -> String {
    format!("q_{question_id}")
}

/// Trims input; blank input becomes `None`.
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Collects `(question_id, value)` pairs for every question with a non-blank field.
///
/// Fields that do not belong to a known question are ignored.
pub fn collect_answers(questions: &[Question], fields: &HashMap<String, String>) -> Vec<(Id, String)> {
    questions
        .iter()
        .filter_map(|q| {
            fields
                .get(&answer_field(q.id))
                .and_then(|raw| normalize(raw))
                .map(|value| (q.id, value))
        })
        .collect()
}
