use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use checkin_core::form::{collect_answers, normalize};
use checkin_core::model::{validate_question, Flash, Id, QuestionKind};
use checkin_core::password::verify_password;
use checkin_core::stats::{couple_series, streak, user_series};
use checkin_core::CoreError;
use checkin_core::week::week_start;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::db::Db;
use crate::session::{redirect, AuthUser, Visitor};
use crate::views::{self, Page};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Db, config: ServerConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(index))
        .route("/login", get(login_form).post(login_submit))
        .route("/logout", get(logout))
        .route("/checkin", get(checkin_form).post(checkin_submit))
        .route("/dashboard", get(dashboard))
        .route("/week/{checkin_id}", get(week_detail))
        .route("/couple", get(couple))
        .route("/admin/questions", get(admin_questions).post(admin_add_question))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn page<'a>(state: &AppState, visitor: &'a Visitor) -> Result<Page<'a>, AppError> {
    Ok(Page {
        user: visitor.user.as_ref(),
        is_admin: visitor.is_admin(state),
        flashes: visitor.take_flashes(state)?,
    })
}

async fn index(State(state): State<AppState>, visitor: Visitor) -> Result<Html<String>, AppError> {
    let page = page(&state, &visitor)?;
    Ok(views::index(&page))
}

async fn login_form(State(state): State<AppState>, visitor: Visitor) -> Result<Html<String>, AppError> {
    let page = page(&state, &visitor)?;
    Ok(views::login(&page, ""))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginForm {
    slug: String,
    password: String,
}

async fn login_submit(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let slug = form.slug.trim();
    let password = form.password.trim();

    if let Some(user) = state.db.user_by_slug(slug)? {
        if verify_password(password, &user.password_hash) {
            let cookie = visitor.login(&state, user.id, Flash::success(format!("Tere, {}!", user.name)))?;
            return Ok(redirect("/dashboard", Some(cookie)));
        }
    }

    tracing::info!(slug, "failed login");
    let mut page = page(&state, &visitor)?;
    page.flashes.push(Flash::danger("Vale kasutaja või parool."));
    Ok(views::login(&page, slug).into_response())
}

async fn logout(State(state): State<AppState>, visitor: Visitor) -> Result<Response, AppError> {
    let cookie = visitor.logout(&state, Flash::info("Logitud välja."))?;
    Ok(redirect("/login", cookie))
}

async fn checkin_form(State(state): State<AppState>, auth: AuthUser) -> Result<Html<String>, AppError> {
    let questions = state.db.list_questions()?;
    let previous = state
        .db
        .latest_checkin(auth.user.id)?
        .map(|c| c.answer_map())
        .unwrap_or_default();
    let week = week_start(checkin_core::today());

    let page = page(&state, &auth.visitor)?;
    Ok(views::checkin(&page, &questions, week, &previous))
}

async fn checkin_submit(
    State(state): State<AppState>,
    auth: AuthUser,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let questions = state.db.list_questions()?;
    let answers = collect_answers(&questions, &fields);
    let week = week_start(checkin_core::today());

    let checkin = state.db.create_checkin(auth.user.id, week, &answers)?;
    tracing::info!(
        user_id = auth.user.id,
        checkin_id = checkin.id,
        week = %week,
        answers = answers.len(),
        "check-in saved"
    );

    let cookie = auth.visitor.flash(&state, Flash::success("Check-in salvestatud!"))?;
    Ok(redirect("/dashboard", cookie))
}

async fn dashboard(State(state): State<AppState>, auth: AuthUser) -> Result<Html<String>, AppError> {
    let checkins = state.db.checkins_for_user(auth.user.id)?;
    let weeks_in_a_row = streak(checkins.iter().map(|c| c.checkin.week_start));
    let scale_question = state.db.first_scale_question()?;
    let chart = scale_question
        .as_ref()
        .map(|q| user_series(&checkins, q.id))
        .unwrap_or_default();

    let page = page(&state, &auth.visitor)?;
    Ok(views::dashboard(&page, &checkins, weeks_in_a_row, scale_question.as_ref(), &chart))
}

async fn week_detail(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(checkin_id): Path<Id>,
) -> Result<Html<String>, AppError> {
    let detail = state.db.checkin_detail(checkin_id)?.ok_or(AppError::NotFound)?;
    if detail.checkin.user_id != auth.user.id {
        return Err(AppError::Forbidden);
    }
    let page = page(&state, &auth.visitor)?;
    Ok(views::week_detail(&page, &detail))
}

async fn couple(State(state): State<AppState>, auth: AuthUser) -> Result<Response, AppError> {
    let users = state.db.list_users()?;
    let scale_question = state.db.first_scale_question()?;
    let Some(scale_question) = scale_question.filter(|_| users.len() >= 2) else {
        let cookie = auth.visitor.flash(
            &state,
            Flash::info("Kahe kasutaja vaade eeldab vähemalt kahte kasutajat ja üht skaalaküsimust."),
        )?;
        return Ok(redirect("/dashboard", cookie));
    };

    let mut per_user = Vec::with_capacity(users.len());
    for user in users {
        let checkins = state.db.checkins_for_user(user.id)?;
        per_user.push((user, checkins));
    }
    let chart = couple_series(&per_user, scale_question.id);

    let page = page(&state, &auth.visitor)?;
    Ok(views::couple(&page, &scale_question, &chart).into_response())
}

async fn admin_questions(State(state): State<AppState>, auth: AuthUser) -> Result<Html<String>, AppError> {
    if !auth.visitor.is_admin(&state) {
        return Err(AppError::Forbidden);
    }
    let questions = state.db.list_questions()?;
    let page = page(&state, &auth.visitor)?;
    Ok(views::admin_questions(&page, &questions))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuestionForm {
    text: String,
    kind: String,
}

async fn admin_add_question(
    State(state): State<AppState>,
    auth: AuthUser,
    Form(form): Form<QuestionForm>,
) -> Result<Response, AppError> {
    if !auth.visitor.is_admin(&state) {
        return Err(AppError::Forbidden);
    }

    let mut cookie = None;
    if let Some(text) = normalize(&form.text) {
        let flash = match validate_question(&text) {
            Ok(()) => {
                let kind = QuestionKind::parse_lenient(&form.kind);
                let question = state.db.insert_question(&text, kind)?;
                tracing::info!(question_id = question.id, %kind, "question added");
                Flash::success("Küsimus lisatud.")
            }
            Err(CoreError::TooLong { .. }) => Flash::danger("Küsimus on liiga pikk."),
            Err(e) => {
                tracing::info!(error = %e, "question rejected");
                Flash::danger("Küsimust ei saanud lisada.")
            }
        };
        cookie = auth.visitor.flash(&state, flash)?;
    }
    Ok(redirect("/admin/questions", cookie))
}

/// Handler error mapped to an HTTP status and a short error page.
#[derive(Debug)]
pub enum AppError {
    NotFound,
    Forbidden,
    Internal(anyhow::Error),
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(value: E) -> Self {
        Self::Internal(value.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Lehte ei leitud."),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Ligipääs keelatud."),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Midagi läks valesti.")
            }
        };
        (status, views::error(status, message)).into_response()
    }
}
