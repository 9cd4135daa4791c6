//! Cookie-based login state.
//!
//! Three cookies carry the user id, email and remember-me token. A request is
//! authenticated when the token matches the one recomputed from the id and
//! email and the user still exists with that email.

use super::server::DashboardServer;
use crate::auth::{remember_token, verify_remember_token};
use crate::types::User;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};
use axum::response::Redirect;
use std::collections::HashMap;

pub const COOKIE_USER_ID: &str = "pt_uid";
pub const COOKIE_EMAIL: &str = "pt_email";
pub const COOKIE_TOKEN: &str = "pt_token";

/// Name/value pairs from every `Cookie` header, values percent-decoded.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for pair in header.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            cookies.insert(name.to_string(), value);
        }
    }
    cookies
}

fn cookie(name: &str, value: &str, max_age: Option<u64>) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        name,
        urlencoding::encode(value)
    );
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    cookie
}

/// `Set-Cookie` headers logging `user` in. Without `max_age` the cookies end
/// with the browser session.
pub fn login_cookies(user: &User, secret: &str, max_age: Option<u64>) -> Vec<(HeaderName, String)> {
    let token = remember_token(secret, user.id, &user.email);
    vec![
        (SET_COOKIE, cookie(COOKIE_USER_ID, &user.id.to_string(), max_age)),
        (SET_COOKIE, cookie(COOKIE_EMAIL, &user.email, max_age)),
        (SET_COOKIE, cookie(COOKIE_TOKEN, &token, max_age)),
    ]
}

/// `Set-Cookie` headers expiring the login cookies.
pub fn logout_cookies() -> Vec<(HeaderName, String)> {
    [COOKIE_USER_ID, COOKIE_EMAIL, COOKIE_TOKEN]
        .into_iter()
        .map(|name| (SET_COOKIE, cookie(name, "", Some(0))))
        .collect()
}

/// The user the request's cookies identify, if they check out.
pub fn authenticate(headers: &HeaderMap, state: &DashboardServer) -> Option<User> {
    let cookies = parse_cookies(headers);
    let user_id: i64 = cookies.get(COOKIE_USER_ID)?.parse().ok()?;
    let email = cookies.get(COOKIE_EMAIL)?;
    let token = cookies.get(COOKIE_TOKEN)?;

    if !verify_remember_token(&state.auth().remember_secret, user_id, email, token) {
        tracing::debug!(user_id, "Rejected login cookie with bad token");
        return None;
    }
    state
        .tracker()
        .get_user(user_id)
        .filter(|user| &user.email == email)
}

/// Extractor for pages that need a logged-in user. Redirects to the login
/// page otherwise.
pub struct CurrentUser(pub User);

impl FromRequestParts<DashboardServer> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &DashboardServer,
    ) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, state)
            .map(CurrentUser)
            .ok_or_else(|| Redirect::to("/login"))
    }
}
