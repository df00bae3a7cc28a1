//! Default data written by `checkin-server init-db`.

use anyhow::Result;
use checkin_core::model::QuestionKind;
use checkin_core::password::{hash_password_with, DEFAULT_ROUNDS};

use crate::db::Db;

/// (name, slug, password). Change the passwords after the first login.
pub const DEFAULT_USERS: [(&str, &str, &str); 2] = [("Mina", "mina", "parool2"), ("Tema", "tema", "parool1")];

pub const DEFAULT_QUESTIONS: [(&str, QuestionKind); 4] = [
    ("Kui lähedaseks sa meid sel nädalal tunned? (1–10)", QuestionKind::Scale),
    ("Kui rahul oled suhtlusega sel nädalal? (1–10)", QuestionKind::Scale),
    ("Mille eest tahaksid partnerile sel nädalal aitäh öelda?", QuestionKind::Text),
    ("Mis võiks järgmisel nädalal parem olla?", QuestionKind::Text),
];

/// Wipes the database and inserts the default users and questions.
pub fn init_db(db: &Db) -> Result<()> {
    init_db_with_rounds(db, DEFAULT_ROUNDS)
}

fn init_db_with_rounds(db: &Db, rounds: u32) -> Result<()> {
    db.reset()?;
    for (name, slug, password) in DEFAULT_USERS {
        db.insert_user(name, slug, &hash_password_with(password, rounds)?)?;
    }
    for (text, kind) in DEFAULT_QUESTIONS {
        db.insert_question(text, kind)?;
    }
    tracing::info!(
        users = DEFAULT_USERS.len(),
        questions = DEFAULT_QUESTIONS.len(),
        "database initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_core::password::verify_password;

    #[test]
    fn init_db_is_repeatable() {
        let db = Db::open_in_memory().unwrap();
        init_db_with_rounds(&db, 1_000).unwrap();
        init_db_with_rounds(&db, 1_000).unwrap();

        let users = db.list_users().unwrap();
        assert_eq!(users.len(), 2);
        assert!(verify_password("parool2", &users[0].password_hash));
        assert_eq!(users[0].slug, "mina");

        let questions = db.list_questions().unwrap();
        assert_eq!(questions.len(), 4);
        assert_eq!(db.first_scale_question().unwrap().unwrap().id, questions[0].id);
    }
}
