//! mauri-web: the Mauri Pest Guide web server.
//!
//! Serves the public pest guide (search, filters, detail pages and the
//! observation form), the admin console, and the JSON procedure surface
//! under `/api`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod intake;
pub mod pages;
pub mod router;
pub mod state;
pub mod storage;
pub mod workflow;
