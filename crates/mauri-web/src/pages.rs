//! HTML rendering. Templates are compiled into the binary and rendered
//! with minijinja; `.html` templates are autoescaped.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use mauri_common::config::SiteConfig;
use mauri_common::Severity;
use minijinja::{Environment, Value};
use serde::Serialize;

use crate::auth::Caller;
use crate::error::ApiError;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("nav.html", include_str!("../templates/nav.html")),
    ("pest_card.html", include_str!("../templates/pest_card.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("search.html", include_str!("../templates/search.html")),
    ("pest_detail.html", include_str!("../templates/pest_detail.html")),
    ("about.html", include_str!("../templates/about.html")),
    ("admin_dashboard.html", include_str!("../templates/admin_dashboard.html")),
    ("admin_submissions.html", include_str!("../templates/admin_submissions.html")),
    ("admin_pests.html", include_str!("../templates/admin_pests.html")),
    ("error.html", include_str!("../templates/error.html")),
];

#[derive(Serialize)]
struct SeverityOption {
    value: &'static str,
    label: &'static str,
}

/// Who is looking at the page; drives the nav bar.
#[derive(Serialize)]
struct Viewer<'a> {
    signed_in: bool,
    is_admin: bool,
    name: Option<&'a str>,
}

impl<'a> From<&'a Caller> for Viewer<'a> {
    fn from(caller: &'a Caller) -> Self {
        let user = caller.user();
        Viewer {
            signed_in: user.is_some(),
            is_admin: caller.is_admin(),
            name: user.and_then(|u| u.name.as_deref().or(u.email.as_deref()).or(Some(u.open_id.as_str()))),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorPage<'a> {
    pub status: u16,
    pub title: &'a str,
    pub message: String,
}

/// Page context plus the viewer. `page` must serialize as a map.
#[derive(Serialize)]
struct Frame<'a, T: Serialize> {
    viewer: Viewer<'a>,
    #[serde(flatten)]
    page: T,
}

pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new(site: &SiteConfig) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }

        env.add_global("site_name", site.name.clone());
        let severities: Vec<SeverityOption> = Severity::ALL
            .iter()
            .map(|s| SeverityOption { value: s.as_str(), label: s.describe() })
            .collect();
        env.add_global("severities", Value::from_serialize(&severities));

        env.add_filter("severity_label", severity_label);
        env.add_filter("severity_tone", severity_tone);
        let base = site.external_link_base.trim_end_matches('/').to_string();
        env.add_filter("council_link", move |link: String| council_link(&base, &link));

        Ok(Self { env })
    }

    pub fn render<T: Serialize>(&self, name: &str, caller: &Caller, page: T) -> Result<String, ApiError> {
        let template = self.env.get_template(name)?;
        let frame = Frame { viewer: Viewer::from(caller), page };
        Ok(template.render(&frame)?)
    }

    /// Turn a page result into a response, rendering failures as an
    /// error page with the matching status.
    pub fn respond(&self, caller: &Caller, result: Result<String, ApiError>) -> Response {
        match result {
            Ok(body) => Html(body).into_response(),
            Err(err) => self.error_page(caller, &err),
        }
    }

    pub fn error_page(&self, caller: &Caller, err: &ApiError) -> Response {
        let status = err.status();
        let title = match status {
            StatusCode::NOT_FOUND => "Not found",
            StatusCode::FORBIDDEN => "Access denied",
            StatusCode::SERVICE_UNAVAILABLE => "Temporarily unavailable",
            StatusCode::BAD_REQUEST => "Invalid request",
            _ => "Something went wrong",
        };
        let page = ErrorPage { status: status.as_u16(), title, message: err.to_string() };
        let body = self
            .render("error.html", caller, page)
            .unwrap_or_else(|_| format!("{title}: {err}"));
        (status, Html(body)).into_response()
    }
}

fn parse_severity(value: Option<String>) -> Option<Severity> {
    value.and_then(|v| v.parse().ok())
}

fn severity_label(value: Option<String>) -> String {
    Severity::label(parse_severity(value)).to_string()
}

/// CSS modifier for the impact badges.
fn severity_tone(value: Option<String>) -> String {
    match parse_severity(value) {
        Some(Severity::None) => "tone-none",
        Some(Severity::Low) => "tone-low",
        Some(Severity::Medium) => "tone-medium",
        Some(Severity::High) => "tone-high",
        Some(Severity::Severe) => "tone-severe",
        None => "tone-unset",
    }
    .to_string()
}

/// Pest links are stored as paths on the regional council site.
fn council_link(base: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else if link.starts_with('/') {
        format!("{base}{link}")
    } else {
        format!("{base}/{link}")
    }
}
