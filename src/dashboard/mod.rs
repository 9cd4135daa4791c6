//! Web dashboard.
//!
//! Server-rendered HTML pages and form handlers on axum, plus a small JSON
//! API. Login state lives in cookies and view state in the query string.

mod pages;
mod server;
pub mod session;
pub mod templates;
pub mod view_state;

pub use server::{DashboardServer, MetricsResponse, build_router, start_server};
