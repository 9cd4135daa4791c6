//! Display formatting for dates, durations and badges.

use crate::types::{Priority, TaskStatus, split_tags};
use chrono::{DateTime, Local, NaiveDate, TimeZone};

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Icons for well-known tags; unknown tags are shown as text.
const TAG_ICONS: &[(&str, &str)] = &[
    ("Dev", "💻"),
    ("Design", "🎨"),
    ("Test", "🧪"),
    ("Deploy", "🚀"),
    ("Docs", "📝"),
    ("API", "🔌"),
    ("Setup", "⚙️"),
    ("Plan", "📋"),
];

/// Today's date in the server's local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Days from `today` until `target`. Negative when `target` is in the past.
pub fn days_until_from(target: NaiveDate, today: NaiveDate) -> i64 {
    (target - today).num_days()
}

/// Days from today until `target`.
pub fn days_until(target: NaiveDate) -> i64 {
    days_until_from(target, today())
}

/// Local calendar date of a millisecond timestamp.
pub fn local_date_of_ms(ms: i64) -> Option<NaiveDate> {
    local_datetime_of_ms(ms).map(|dt| dt.date_naive())
}

fn local_datetime_of_ms(ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).single()
}

/// e.g. "2024-11-23".
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// e.g. "2024-11-23 15:30", in local time.
pub fn format_datetime(ms: i64) -> String {
    local_datetime_of_ms(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// "start ~ end", or just the start when there is no end. Empty without a start.
pub fn date_range_text(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    let Some(start) = start else {
        return String::new();
    };
    match end {
        Some(end) => format!("{} ~ {}", format_date(start), format_date(end)),
        None => format_date(start),
    }
}

/// Coarse "time ago" text for a timestamp.
pub fn relative_time(then_ms: i64, now_ms: i64) -> String {
    let diff = now_ms - then_ms;
    if diff >= DAY_MS {
        plural(diff / DAY_MS, "day")
    } else if diff >= HOUR_MS {
        plural(diff / HOUR_MS, "hour")
    } else if diff >= MINUTE_MS {
        plural(diff / MINUTE_MS, "minute")
    } else {
        "just now".to_string()
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

/// Icons for a comma-separated tag string.
pub fn tag_icons(tags: &str) -> String {
    split_tags(tags)
        .into_iter()
        .map(|tag| {
            TAG_ICONS
                .iter()
                .find(|(name, _)| *name == tag)
                .map(|(_, icon)| *icon)
                .unwrap_or(tag)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn priority_badge(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "🟢 Low",
        Priority::Medium => "🟡 Medium",
        Priority::High => "🔴 High",
    }
}

pub fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "📝",
        TaskStatus::InProgress => "🔄",
        TaskStatus::Done => "✅",
    }
}

pub fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "To Do",
        TaskStatus::InProgress => "In Progress",
        TaskStatus::Done => "Done",
    }
}

/// Urgency of a due date relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    Overdue,
    Today,
    Soon,
    Later,
}

impl DueState {
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Overdue => "due-overdue",
            Self::Today => "due-today",
            Self::Soon => "due-soon",
            Self::Later => "due-later",
        }
    }
}

/// D-day style badge text and urgency for a due date.
pub fn due_date_badge_from(due: NaiveDate, today: NaiveDate) -> (String, DueState) {
    let days = days_until_from(due, today);
    if days < 0 {
        (format!("🔴 D+{} (overdue)", -days), DueState::Overdue)
    } else if days == 0 {
        ("🔥 D-Day".to_string(), DueState::Today)
    } else if days <= 3 {
        (format!("🟡 D-{}", days), DueState::Soon)
    } else {
        (format!("🟢 D-{}", days), DueState::Later)
    }
}

pub fn due_date_badge(due: NaiveDate) -> (String, DueState) {
    due_date_badge_from(due, today())
}

/// "2h", "1.5h", or "TBD" when no estimate is set.
pub fn format_hours(hours: Option<f64>) -> String {
    match hours {
        Some(h) if h > 0.0 => {
            if h.fract() == 0.0 {
                format!("{}h", h as i64)
            } else {
                format!("{}h", h)
            }
        }
        _ => "TBD".to_string(),
    }
}

/// Cut `text` to `max_chars` characters, appending "..." when shortened.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

/// Last path segment of a repository URL.
pub fn github_repo_name(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn days_until_is_signed() {
        let today = date(2024, 5, 10);
        assert_eq!(days_until_from(today, today), 0);
        assert_eq!(days_until_from(date(2024, 5, 9), today), -1);
        assert_eq!(days_until_from(date(2024, 5, 15), today), 5);
    }

    #[test]
    fn days_until_today_is_zero() {
        assert_eq!(days_until(today()), 0);
        assert_eq!(days_until(today() - chrono::Duration::days(1)), -1);
        assert_eq!(days_until(today() + chrono::Duration::days(5)), 5);
    }

    #[test]
    fn relative_time_uses_inclusive_thresholds() {
        let now = 10 * DAY_MS;
        assert_eq!(relative_time(now - DAY_MS, now), "1 day ago");
        assert_eq!(relative_time(now - 3 * DAY_MS - HOUR_MS, now), "3 days ago");
        assert_eq!(relative_time(now - HOUR_MS, now), "1 hour ago");
        assert_eq!(relative_time(now - DAY_MS + 1, now), "23 hours ago");
        assert_eq!(relative_time(now - MINUTE_MS, now), "1 minute ago");
        assert_eq!(relative_time(now - MINUTE_MS + 1, now), "just now");
        assert_eq!(relative_time(now + MINUTE_MS, now), "just now");
    }

    #[test]
    fn date_range_text_variants() {
        assert_eq!(date_range_text(None, Some(date(2024, 1, 2))), "");
        assert_eq!(date_range_text(Some(date(2024, 1, 1)), None), "2024-01-01");
        assert_eq!(
            date_range_text(Some(date(2024, 1, 1)), Some(date(2024, 2, 1))),
            "2024-01-01 ~ 2024-02-01"
        );
    }

    #[test]
    fn tag_icons_fall_back_to_text() {
        assert_eq!(tag_icons("Dev, Design"), "💻 🎨");
        assert_eq!(tag_icons("Dev,Research"), "💻 Research");
        assert_eq!(tag_icons(""), "");
    }

    #[test]
    fn due_badge_buckets() {
        let today = date(2024, 5, 10);
        assert_eq!(
            due_date_badge_from(date(2024, 5, 8), today),
            ("🔴 D+2 (overdue)".to_string(), DueState::Overdue)
        );
        assert_eq!(due_date_badge_from(today, today).1, DueState::Today);
        assert_eq!(due_date_badge_from(date(2024, 5, 13), today).0, "🟡 D-3");
        assert_eq!(due_date_badge_from(date(2024, 5, 14), today).1, DueState::Later);
    }

    #[test]
    fn format_hours_variants() {
        assert_eq!(format_hours(Some(2.0)), "2h");
        assert_eq!(format_hours(Some(1.5)), "1.5h");
        assert_eq!(format_hours(Some(0.0)), "TBD");
        assert_eq!(format_hours(None), "TBD");
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("회고회고회고", 2), "회고...");
    }

    #[test]
    fn repo_name_is_last_segment() {
        assert_eq!(github_repo_name("https://github.com/acme/tracker/"), "tracker");
        assert_eq!(github_repo_name("tracker"), "tracker");
    }
}
