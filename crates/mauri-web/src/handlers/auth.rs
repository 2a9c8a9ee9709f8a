//! `auth.*` procedures.

use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use mauri_common::User;

use super::Ack;
use crate::auth::{clear_session, Caller};
use crate::state::SharedState;

/// GET /api/auth/me: the signed-in user, or `null`.
pub async fn me(caller: Caller) -> Json<Option<User>> {
    Json(caller.0)
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<SharedState>, jar: CookieJar) -> (CookieJar, Json<Ack>) {
    (clear_session(jar, &state.config.auth.session_cookie), Json(Ack::ok()))
}
