//! Cookie sessions backed by the `sessions` table.
//!
//! The cookie carries `<token>.<sig>` where `sig` is a SHA-256 over the server
//! secret and the token. The session row holds the logged-in user (if any) and
//! the pending flash messages.

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use checkin_core::model::{Flash, Id, User};
use checkin_core::now_ms;
use checkin_core::password::constant_time_eq;
use sha2::{Digest, Sha256};

use crate::db::SessionRecord;
use crate::http::{AppError, AppState};

pub const COOKIE_NAME: &str = "checkin_session";

fn sign(secret: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cookie value for a session token.
pub fn encode_cookie(secret: &str, token: &str) -> String {
    format!("{token}.{}", sign(secret, token))
}

/// Extracts the token from a cookie value, rejecting bad signatures.
pub fn decode_cookie(secret: &str, value: &str) -> Option<String> {
    let (token, sig) = value.rsplit_once('.')?;
    if token.is_empty() {
        return None;
    }
    constant_time_eq(sign(secret, token).as_bytes(), sig.as_bytes()).then(|| token.to_string())
}

/// Finds a cookie by name across all `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

fn set_cookie(state: &AppState, token: &str) -> Result<HeaderValue, AppError> {
    let value = format!(
        "{COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        encode_cookie(&state.config.secret_key, token),
        state.config.session_ttl.as_secs()
    );
    Ok(HeaderValue::from_str(&value)?)
}

/// Redirect response, optionally setting the session cookie.
pub fn redirect(location: &str, cookie: Option<HeaderValue>) -> Response {
    let mut resp = Redirect::to(location).into_response();
    if let Some(cookie) = cookie {
        resp.headers_mut().append(SET_COOKIE, cookie);
    }
    resp
}

/// Whoever is making the request: maybe a session, maybe a logged-in user.
#[derive(Debug, Clone, Default)]
pub struct Visitor {
    pub session: Option<SessionRecord>,
    pub user: Option<User>,
}

impl Visitor {
    /// Queues a flash for the next page. Creates an anonymous session when needed
    /// and returns the cookie to set in that case.
    pub fn flash(&self, state: &AppState, flash: Flash) -> Result<Option<HeaderValue>, AppError> {
        match &self.session {
            Some(session) => {
                state.db.push_flash(&session.token, flash)?;
                Ok(None)
            }
            None => {
                let token = state.db.create_session(
                    None,
                    &[flash],
                    now_ms(),
                    state.config.session_ttl_ms(),
                )?;
                Ok(Some(set_cookie(state, &token)?))
            }
        }
    }

    /// Starts an authenticated session under a fresh token. Pending flashes of the
    /// old session are carried over.
    pub fn login(&self, state: &AppState, user_id: Id, flash: Flash) -> Result<HeaderValue, AppError> {
        let mut flashes = Vec::new();
        if let Some(old) = &self.session {
            flashes = state.db.take_flashes(&old.token)?;
            state.db.delete_session(&old.token)?;
        }
        flashes.push(flash);
        let token = state.db.create_session(
            Some(user_id),
            &flashes,
            now_ms(),
            state.config.session_ttl_ms(),
        )?;
        tracing::info!(user_id, "user logged in");
        set_cookie(state, &token)
    }

    /// Drops the user from the session but keeps it for the flash.
    pub fn logout(&self, state: &AppState, flash: Flash) -> Result<Option<HeaderValue>, AppError> {
        if let Some(session) = &self.session {
            state.db.set_session_user(&session.token, None)?;
            if let Some(user_id) = session.user_id {
                tracing::info!(user_id, "user logged out");
            }
        }
        self.flash(state, flash)
    }

    /// Pending flashes, cleared as they are returned.
    pub fn take_flashes(&self, state: &AppState) -> Result<Vec<Flash>, AppError> {
        match &self.session {
            Some(session) if !session.flashes.is_empty() => Ok(state.db.take_flashes(&session.token)?),
            _ => Ok(Vec::new()),
        }
    }

    pub fn is_admin(&self, state: &AppState) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| u.slug == state.config.admin_slug)
    }
}

impl FromRequestParts<AppState> for Visitor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = read_cookie(&parts.headers, COOKIE_NAME)
            .and_then(|v| decode_cookie(&state.config.secret_key, v))
        else {
            return Ok(Visitor::default());
        };

        let Some(session) = state.db.session_by_token(&token, now_ms())? else {
            return Ok(Visitor::default());
        };
        let user = match session.user_id {
            Some(id) => state.db.user_by_id(id)?,
            None => None,
        };
        Ok(Visitor {
            session: Some(session),
            user,
        })
    }
}

/// A visitor that is logged in. Anyone else is sent to the login page.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub visitor: Visitor,
    pub user: User,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let visitor = Visitor::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        match visitor.user.clone() {
            Some(user) => Ok(AuthUser { visitor, user }),
            None => Err(redirect("/login", None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_roundtrip_and_tamper() {
        let value = encode_cookie("secret", "abc-123");
        assert_eq!(decode_cookie("secret", &value).as_deref(), Some("abc-123"));
        assert_eq!(decode_cookie("other", &value), None);
        assert_eq!(decode_cookie("secret", "abc-124.deadbeef"), None);
        assert_eq!(decode_cookie("secret", "no-signature"), None);
    }

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; checkin_session=tok.sig"));
        headers.append(COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(read_cookie(&headers, COOKIE_NAME), Some("tok.sig"));
        assert_eq!(read_cookie(&headers, "other"), Some("1"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }
}
