//! Integration tests for the core crate.

use std::collections::HashMap;

use chrono::NaiveDate;
use checkin_core::form::{answer_field, collect_answers, normalize};
use checkin_core::model::{
    validate_question, validate_user, Answer, CheckIn, CheckInWithAnswers, Flash, Question,
    QuestionKind, User,
};
use checkin_core::password::{hash_password_with, verify_password};
use checkin_core::stats::{couple_series, parse_scale, streak, user_series};
use checkin_core::CoreError;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn checkin(id: i64, user_id: i64, week: NaiveDate, answers: &[(i64, &str)]) -> CheckInWithAnswers {
    CheckInWithAnswers {
        checkin: CheckIn { id, user_id, week_start: week },
        answers: answers
            .iter()
            .enumerate()
            .map(|(i, (qid, value))| Answer {
                id: id * 100 + i as i64,
                checkin_id: id,
                question_id: *qid,
                value: value.to_string(),
            })
            .collect(),
    }
}

fn user(id: i64, name: &str) -> User {
    User {
        id,
        name: name.into(),
        slug: name.to_lowercase(),
        password_hash: String::new(),
    }
}

#[test]
fn streak_of_nothing_is_zero() {
    assert_eq!(streak(Vec::new()), 0);
}

#[test]
fn streak_counts_consecutive_weeks_back_from_latest() {
    let weeks = vec![day(2024, 1, 1), day(2024, 1, 15), day(2024, 1, 22), day(2024, 1, 29)];
    assert_eq!(streak(weeks), 3);
}

#[test]
fn streak_ignores_duplicate_weeks() {
    let weeks = vec![day(2024, 1, 22), day(2024, 1, 29), day(2024, 1, 29), day(2024, 1, 22)];
    assert_eq!(streak(weeks), 2);
}

#[test]
fn single_week_is_a_streak_of_one() {
    assert_eq!(streak(vec![day(2023, 6, 5)]), 1);
}

#[test]
fn parse_scale_accepts_integers_only() {
    assert_eq!(parse_scale(" 7 "), Some(7));
    assert_eq!(parse_scale("seven"), None);
    assert_eq!(parse_scale("7.5"), None);
}

#[test]
fn user_series_orders_by_week_and_skips_unanswered() {
    let checkins = vec![
        checkin(3, 1, day(2024, 2, 12), &[(1, "8")]),
        checkin(2, 1, day(2024, 2, 5), &[(2, "only text")]),
        checkin(1, 1, day(2024, 1, 29), &[(1, "nope")]),
    ];
    let series = user_series(&checkins, 1);
    assert_eq!(series.labels, vec!["2024-01-29", "2024-02-12"]);
    assert_eq!(series.values, vec![None, Some(8)]);
}

#[test]
fn couple_series_aligns_users_on_shared_weeks() {
    let users = vec![
        (
            user(1, "Mina"),
            vec![
                checkin(1, 1, day(2024, 1, 1), &[(1, "5")]),
                checkin(3, 1, day(2024, 1, 8), &[(1, "6")]),
                checkin(4, 1, day(2024, 1, 8), &[(1, "9")]),
            ],
        ),
        (user(2, "Tema"), vec![checkin(2, 2, day(2024, 1, 15), &[(2, "text only")])]),
    ];

    let chart = couple_series(&users, 1);
    assert_eq!(chart.labels, vec!["2024-01-01", "2024-01-08", "2024-01-15"]);
    assert_eq!(chart.series[0].name, "Mina");
    assert_eq!(chart.series[0].values, vec![Some(5), Some(9), None]);
    assert_eq!(chart.series[1].values, vec![None, None, None]);
}

#[test]
fn password_roundtrip_and_rejections() {
    let stored = hash_password_with("parool1", 1_000).unwrap();
    assert!(stored.starts_with("$pbkdf2-sha256$"));
    assert!(stored.contains("i=1000"));
    assert!(verify_password("parool1", &stored));
    assert!(!verify_password("parool2", &stored));
    assert!(!verify_password("parool1", "plaintext"));
    assert!(!verify_password("parool1", "sha256$1$00$00"));
    assert!(!verify_password("parool1", "$pbkdf2-sha256$i=1000,l=32$bm9wZQ$"));
    assert!(!verify_password("parool1", ""));
}

#[test]
fn password_hashes_are_salted() {
    let a = hash_password_with("same", 1_000).unwrap();
    let b = hash_password_with("same", 1_000).unwrap();
    assert_ne!(a, b);
    assert!(verify_password("same", &a));
    assert!(verify_password("same", &b));
}

#[test]
fn question_kind_parsing() {
    assert_eq!("scale".parse::<QuestionKind>(), Ok(QuestionKind::Scale));
    assert_eq!(
        "slider".parse::<QuestionKind>(),
        Err(CoreError::UnknownQuestionKind("slider".into()))
    );
    assert_eq!(QuestionKind::parse_lenient("slider"), QuestionKind::Text);
    assert_eq!(QuestionKind::parse_lenient(" scale "), QuestionKind::Scale);
    assert_eq!(serde_json::to_string(&QuestionKind::Scale).unwrap(), r#""scale""#);
}

#[test]
fn collect_answers_keeps_non_blank_known_fields() {
    let questions = vec![
        Question { id: 1, text: "a".into(), kind: QuestionKind::Scale },
        Question { id: 2, text: "b".into(), kind: QuestionKind::Text },
        Question { id: 3, text: "c".into(), kind: QuestionKind::Text },
    ];
    let mut fields = HashMap::new();
    fields.insert(answer_field(1), " 7 ".to_string());
    fields.insert(answer_field(2), "   ".to_string());
    fields.insert("q_99".to_string(), "stray".to_string());

    let answers = collect_answers(&questions, &fields);
    assert_eq!(answers, vec![(1, "7".to_string())]);
    assert_eq!(normalize("\tx\n"), Some("x".to_string()));
}

#[test]
fn text_limits() {
    assert!(validate_user("Mina", "mina").is_ok());
    assert_eq!(validate_user(" ", "mina"), Err(CoreError::Empty("name")));
    assert_eq!(
        validate_user("Mina", &"x".repeat(51)),
        Err(CoreError::TooLong { field: "slug", max: 50 })
    );
    assert!(validate_question(&"ä".repeat(255)).is_ok());
    assert!(validate_question(&"ä".repeat(256)).is_err());
}

#[test]
fn flash_serializes_with_snake_case_kind() {
    let json = serde_json::to_string(&Flash::danger("Vale")).unwrap();
    assert_eq!(json, r#"{"kind":"danger","message":"Vale"}"#);
}
