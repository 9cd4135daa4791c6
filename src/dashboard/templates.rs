//! HTML templates for the web UI.
//!
//! Templates are embedded at compile time using `include_str!`.

/// Page skeleton with styles. Placeholders: `{{title}}`, `{{body}}`.
pub const BASE_TEMPLATE: &str = include_str!("templates/base.html");

/// Wrap `body` in the base template. `title` is escaped; `body` is inserted as is.
pub fn render_page(title: &str, body: &str) -> String {
    BASE_TEMPLATE
        .replace("{{title}}", &html_escape(title))
        .replace("{{body}}", body)
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
