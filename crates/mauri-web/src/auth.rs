//! Caller identity and the admin gate.
//!
//! Identity is established upstream: the fronting proxy authenticates the
//! user and forwards their open id in a trusted header. The session
//! middleware turns that header into a `User`, recording a sign-in the
//! first time the open id is seen without a matching session cookie.
//! Handlers then take `Caller` (anyone) or `AdminCaller` (admins only).

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use mauri_common::{UpsertUser, User};
use std::convert::Infallible;

use crate::error::ApiError;
use crate::state::SharedState;

pub const EMAIL_HEADER: &str = "x-forwarded-email";
pub const NAME_HEADER: &str = "x-forwarded-preferred-username";

/// The resolved caller for this request, if any.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<User>);

impl Caller {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(User::is_admin)
    }

    /// The admin check shared by the JSON gate and the admin pages.
    pub fn require_admin(&self) -> Result<&User, ApiError> {
        match &self.0 {
            Some(user) if user.is_admin() => Ok(user),
            Some(user) => {
                tracing::info!(open_id = %user.open_id, "admin operation refused");
                Err(ApiError::forbidden())
            }
            None => Err(ApiError::forbidden()),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().cloned().unwrap_or_default())
    }
}

/// Extracting this fails with permission-denied unless the caller is an
/// admin, so the handler body never runs for anyone else.
#[derive(Debug, Clone)]
pub struct AdminCaller(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AdminCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = parts.extensions.get::<Caller>().cloned().unwrap_or_default();
        caller.require_admin().cloned().map(AdminCaller)
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolve the caller and stash it in the request extensions.
pub async fn session_middleware(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let auth = &state.config.auth;
    let Some(open_id) = header_value(request.headers(), &auth.identity_header) else {
        request.extensions_mut().insert(Caller(None));
        return next.run(request).await;
    };

    let has_session = jar
        .get(&auth.session_cookie)
        .is_some_and(|c| c.value() == open_id);

    let existing = if has_session {
        match state.db.users().find_by_open_id(&open_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "user lookup failed");
                None
            }
        }
    } else {
        None
    };

    let (user, signed_in) = match existing {
        Some(user) => (Some(user), false),
        None => {
            let mut upsert = UpsertUser::new(open_id.clone());
            upsert.email = header_value(request.headers(), EMAIL_HEADER);
            upsert.name = header_value(request.headers(), NAME_HEADER);
            upsert.login_method = Some("proxy".to_string());
            match sign_in(&state, upsert).await {
                Ok(user) => (Some(user), true),
                Err(e) => {
                    tracing::warn!(open_id = %open_id, error = %e, "sign-in not recorded");
                    (None, false)
                }
            }
        }
    };

    request.extensions_mut().insert(Caller(user));
    let response = next.run(request).await;

    if signed_in {
        let cookie = Cookie::build((auth.session_cookie.clone(), open_id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        (jar.add(cookie), response).into_response()
    } else {
        response
    }
}

async fn sign_in(state: &SharedState, upsert: UpsertUser) -> Result<User, ApiError> {
    let upsert = upsert.resolve(state.config.auth.owner_open_id.as_deref(), Utc::now())?;
    let user = state.db.users().upsert(upsert).await?;
    tracing::info!(open_id = %user.open_id, role = %user.role, "sign-in recorded");
    Ok(user)
}

/// Cookie removal sent by `auth.logout`.
pub fn clear_session(jar: CookieJar, cookie_name: &str) -> CookieJar {
    jar.remove(Cookie::build(cookie_name.to_string()).path("/"))
}
