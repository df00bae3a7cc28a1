use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use checkin_core::model::{
    validate_question, validate_user, Answer, CheckIn, CheckInWithAnswers, Flash, Id, Question,
    QuestionKind, User,
};
use checkin_core::EpochMs;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const SCHEMA: &str = include_str!("../schema.sql");

const DROP_ALL: &str = "
    DROP TABLE IF EXISTS sessions;
    DROP TABLE IF EXISTS answers;
    DROP TABLE IF EXISTS check_ins;
    DROP TABLE IF EXISTS questions;
    DROP TABLE IF EXISTS users;
";

/// SQLite-backed store. Cloning shares the same connection.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

/// A browser session as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: Option<Id>,
    pub flashes: Vec<Flash>,
}

/// One answered question on the week detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerLine {
    pub question_id: Id,
    pub question_text: String,
    pub kind: QuestionKind,
    pub value: String,
}

/// A check-in with its answers resolved to question texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInDetail {
    pub checkin: CheckIn,
    pub lines: Vec<AnswerLine>,
}

impl Db {
    /// Opens (or creates) the database file and applies the schema.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating data dir {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db {}", db_path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA).context("applying schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    /// Drops every table and recreates an empty schema.
    pub fn reset(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(DROP_ALL).context("dropping tables")?;
        conn.execute_batch(SCHEMA).context("applying schema")?;
        Ok(())
    }

    // --- users ---

    pub fn insert_user(&self, name: &str, slug: &str, password_hash: &str) -> Result<User> {
        validate_user(name, slug)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users(name, slug, password_hash) VALUES (?1, ?2, ?3)",
            params![name, slug, password_hash],
        )
        .with_context(|| format!("insert user {slug}"))?;
        Ok(User {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            slug: slug.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    pub fn user_by_id(&self, id: Id) -> Result<Option<User>> {
        let conn = self.lock()?;
        let user = conn
            .query_row(
                "SELECT id, name, slug, password_hash FROM users WHERE id=?1",
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn user_by_slug(&self, slug: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let user = conn
            .query_row(
                "SELECT id, name, slug, password_hash FROM users WHERE slug=?1",
                params![slug],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name, slug, password_hash FROM users ORDER BY id ASC")?;
        let rows = stmt.query_map([], user_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // --- questions ---

    pub fn insert_question(&self, text: &str, kind: QuestionKind) -> Result<Question> {
        validate_question(text)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO questions(text, kind) VALUES (?1, ?2)",
            params![text, kind.as_str()],
        )?;
        Ok(Question {
            id: conn.last_insert_rowid(),
            text: text.to_string(),
            kind,
        })
    }

    pub fn list_questions(&self) -> Result<Vec<Question>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, text, kind FROM questions ORDER BY id ASC")?;
        let rows = stmt.query_map([], question_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// The scale question charted on the dashboard: the oldest one.
    pub fn first_scale_question(&self) -> Result<Option<Question>> {
        let conn = self.lock()?;
        let q = conn
            .query_row(
                "SELECT id, text, kind FROM questions WHERE kind='scale' ORDER BY id ASC LIMIT 1",
                [],
                question_from_row,
            )
            .optional()?;
        Ok(q)
    }

    // --- check-ins ---

    /// Stores a check-in and its answers atomically.
    pub fn create_checkin(
        &self,
        user_id: Id,
        week_start: NaiveDate,
        answers: &[(Id, String)],
    ) -> Result<CheckIn> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO check_ins(user_id, week_start) VALUES (?1, ?2)",
            params![user_id, week_start],
        )?;
        let checkin_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO answers(checkin_id, question_id, value) VALUES (?1, ?2, ?3)",
            )?;
            for (question_id, value) in answers {
                stmt.execute(params![checkin_id, question_id, value])?;
            }
        }
        tx.commit()?;
        Ok(CheckIn {
            id: checkin_id,
            user_id,
            week_start,
        })
    }

    /// All check-ins of a user, newest week first.
    pub fn checkins_for_user(&self, user_id: Id) -> Result<Vec<CheckInWithAnswers>> {
        let conn = self.lock()?;

        let checkins = {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, week_start FROM check_ins
                 WHERE user_id=?1 ORDER BY week_start DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![user_id], checkin_from_row)?;
            let checkins = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            checkins
        };

        let mut answers: BTreeMap<Id, Vec<Answer>> = BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.checkin_id, a.question_id, a.value
                 FROM answers a JOIN check_ins c ON c.id = a.checkin_id
                 WHERE c.user_id=?1 ORDER BY a.id ASC",
            )?;
            let rows = stmt.query_map(params![user_id], answer_from_row)?;
            for row in rows {
                let answer = row?;
                answers.entry(answer.checkin_id).or_default().push(answer);
            }
        }

        Ok(checkins
            .into_iter()
            .map(|checkin| CheckInWithAnswers {
                answers: answers.remove(&checkin.id).unwrap_or_default(),
                checkin,
            })
            .collect())
    }

    /// The user's most recent check-in (latest week, then latest id).
    pub fn latest_checkin(&self, user_id: Id) -> Result<Option<CheckInWithAnswers>> {
        let conn = self.lock()?;
        let checkin = conn
            .query_row(
                "SELECT id, user_id, week_start FROM check_ins
                 WHERE user_id=?1 ORDER BY week_start DESC, id DESC LIMIT 1",
                params![user_id],
                checkin_from_row,
            )
            .optional()?;
        let Some(checkin) = checkin else {
            return Ok(None);
        };
        let answers = answers_for(&conn, checkin.id)?;
        Ok(Some(CheckInWithAnswers { checkin, answers }))
    }

    /// A check-in with question texts, for the week detail page.
    pub fn checkin_detail(&self, checkin_id: Id) -> Result<Option<CheckInDetail>> {
        let conn = self.lock()?;
        let checkin = conn
            .query_row(
                "SELECT id, user_id, week_start FROM check_ins WHERE id=?1",
                params![checkin_id],
                checkin_from_row,
            )
            .optional()?;
        let Some(checkin) = checkin else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT q.id, q.text, q.kind, a.value
             FROM answers a JOIN questions q ON q.id = a.question_id
             WHERE a.checkin_id=?1 ORDER BY q.id ASC, a.id ASC",
        )?;
        let rows = stmt.query_map(params![checkin_id], |r| {
            Ok(AnswerLine {
                question_id: r.get(0)?,
                question_text: r.get(1)?,
                kind: kind_from_column(r, 2)?,
                value: r.get(3)?,
            })
        })?;
        let lines = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(CheckInDetail { checkin, lines }))
    }

    // --- sessions ---

    /// Creates a session and returns its token.
    pub fn create_session(
        &self,
        user_id: Option<Id>,
        flashes: &[Flash],
        now: EpochMs,
        ttl_ms: i64,
    ) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let flashes_json = serde_json::to_string(flashes)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions(token, user_id, flashes_json, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![token, user_id, flashes_json, now, now.saturating_add(ttl_ms)],
        )?;
        Ok(token)
    }

    /// Looks up a live session. Expired rows are treated as missing.
    pub fn session_by_token(&self, token: &str, now: EpochMs) -> Result<Option<SessionRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT token, user_id, flashes_json FROM sessions WHERE token=?1 AND expires_at > ?2",
                params![token, now],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, Option<Id>>(1)?, r.get::<_, String>(2)?)),
            )
            .optional()?;
        let Some((token, user_id, flashes_json)) = row else {
            return Ok(None);
        };
        let flashes = serde_json::from_str(&flashes_json).unwrap_or_default();
        Ok(Some(SessionRecord {
            token,
            user_id,
            flashes,
        }))
    }

    pub fn set_session_user(&self, token: &str, user_id: Option<Id>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE sessions SET user_id=?1 WHERE token=?2",
            params![user_id, token],
        )?;
        Ok(())
    }

    pub fn push_flash(&self, token: &str, flash: Flash) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current: Option<String> = tx
            .query_row(
                "SELECT flashes_json FROM sessions WHERE token=?1",
                params![token],
                |r| r.get(0),
            )
            .optional()?;
        let mut flashes: Vec<Flash> = current
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        flashes.push(flash);
        tx.execute(
            "UPDATE sessions SET flashes_json=?1 WHERE token=?2",
            params![serde_json::to_string(&flashes)?, token],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Returns and clears the pending flashes of a session.
    pub fn take_flashes(&self, token: &str) -> Result<Vec<Flash>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current: Option<String> = tx
            .query_row(
                "SELECT flashes_json FROM sessions WHERE token=?1",
                params![token],
                |r| r.get(0),
            )
            .optional()?;
        let flashes: Vec<Flash> = current
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        if !flashes.is_empty() {
            tx.execute(
                "UPDATE sessions SET flashes_json='[]' WHERE token=?1",
                params![token],
            )?;
        }
        tx.commit()?;
        Ok(flashes)
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM sessions WHERE token=?1", params![token])?;
        Ok(())
    }

    /// Deletes expired sessions; returns how many were removed.
    pub fn prune_sessions(&self, now: EpochMs) -> Result<usize> {
        let conn = self.lock()?;
        let n = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
        Ok(n)
    }
}

fn answers_for(conn: &Connection, checkin_id: Id) -> Result<Vec<Answer>> {
    let mut stmt = conn.prepare(
        "SELECT id, checkin_id, question_id, value FROM answers WHERE checkin_id=?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![checkin_id], answer_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn user_from_row(r: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: r.get(0)?,
        name: r.get(1)?,
        slug: r.get(2)?,
        password_hash: r.get(3)?,
    })
}

fn question_from_row(r: &Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: r.get(0)?,
        text: r.get(1)?,
        kind: kind_from_column(r, 2)?,
    })
}

fn checkin_from_row(r: &Row<'_>) -> rusqlite::Result<CheckIn> {
    Ok(CheckIn {
        id: r.get(0)?,
        user_id: r.get(1)?,
        week_start: r.get(2)?,
    })
}

fn answer_from_row(r: &Row<'_>) -> rusqlite::Result<Answer> {
    Ok(Answer {
        id: r.get(0)?,
        checkin_id: r.get(1)?,
        question_id: r.get(2)?,
        value: r.get(3)?,
    })
}

fn kind_from_column(r: &Row<'_>, idx: usize) -> rusqlite::Result<QuestionKind> {
    let raw: String = r.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
