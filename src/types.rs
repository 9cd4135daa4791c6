//! Core types for the project tracker.

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Implements SQLite text conversions for a string-backed enum.
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                <$ty>::from_str(s).ok_or_else(|| {
                    FromSqlError::Other(format!("unknown {}: {}", stringify!($ty), s).into())
                })
            }
        }
    };
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [Self::Active, Self::Completed, Self::OnHold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "on_hold" => Some(Self::OnHold),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::OnHold => "On hold",
        }
    }
}

sql_text_enum!(ProjectStatus);

/// Board column a task sits in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Todo, Self::InProgress, Self::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    /// The status a card's primary action button moves the task to.
    ///
    /// Done tasks move back to in progress.
    pub fn next(&self) -> TaskStatus {
        match self {
            Self::Todo => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::InProgress,
        }
    }
}

sql_text_enum!(TaskStatus);

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

sql_text_enum!(Priority);

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub username: String,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

/// A tracked project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub github_url: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields for a new project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub github_url: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_end_date: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
}

/// Sparse project update. `None` leaves a column untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub github_url: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub target_end_date: Option<Option<NaiveDate>>,
    pub status: Option<ProjectStatus>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.github_url.is_none()
            && self.start_date.is_none()
            && self.target_end_date.is_none()
            && self.status.is_none()
    }
}

/// Equality filters for listing projects, combined with AND.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub user_id: Option<i64>,
}

/// A task on a project's board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Comma-separated, not normalized.
    pub tags: Option<String>,
    pub estimated_hours: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl Task {
    /// Individual tags, trimmed, blanks dropped.
    pub fn tag_list(&self) -> Vec<&str> {
        split_tags(self.tags.as_deref().unwrap_or_default())
    }
}

/// Split a comma-separated tag string.
pub fn split_tags(tags: &str) -> Vec<&str> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Fields for a new task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub tags: Option<String>,
    pub estimated_hours: Option<f64>,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    /// A todo/medium task with only a title, as created by quick add.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Sparse task update. started_at/completed_at are not editable; they follow `status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub tags: Option<Option<String>>,
    pub estimated_hours: Option<Option<f64>>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.estimated_hours.is_none()
            && self.due_date.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecklistItem {
    pub id: i64,
    pub task_id: i64,
    pub content: String,
    pub is_checked: bool,
    pub created_at: i64,
}

/// A dated checkpoint within a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub is_completed: bool,
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMilestone {
    pub title: String,
    pub description: Option<String>,
    /// Required; kept optional so a missing date reaches validation.
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MilestoneUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub target_date: Option<NaiveDate>,
}

impl MilestoneUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.target_date.is_none()
    }
}

/// KPT retrospective (plus Learning) of a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Retrospective {
    pub id: i64,
    pub project_id: i64,
    pub keep_content: Option<String>,
    pub problem_content: Option<String>,
    pub try_content: Option<String>,
    pub learning_content: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// The four free-text retrospective fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrospectiveInput {
    pub keep_content: Option<String>,
    pub problem_content: Option<String>,
    pub try_content: Option<String>,
    pub learning_content: Option<String>,
}

impl RetrospectiveInput {
    /// Trim every field and turn blanks into `None`.
    pub fn normalized(self) -> Self {
        Self {
            keep_content: non_blank(self.keep_content),
            problem_content: non_blank(self.problem_content),
            try_content: non_blank(self.try_content),
            learning_content: non_blank(self.learning_content),
        }
    }
}

/// A retrospective together with the name of its project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrospectiveSummary {
    #[serde(flatten)]
    pub retrospective: Retrospective,
    pub project_name: String,
}

/// Signup form fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Trim a string and drop it if nothing is left.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::from_str("blocked"), None);
        assert_eq!(ProjectStatus::from_str("on_hold"), Some(ProjectStatus::OnHold));
        assert_eq!(Priority::from_str("urgent"), None);
    }

    #[test]
    fn next_status_cycles_back_from_done() {
        assert_eq!(TaskStatus::Todo.next(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::InProgress.next(), TaskStatus::Done);
        assert_eq!(TaskStatus::Done.next(), TaskStatus::InProgress);
    }

    #[test]
    fn split_tags_trims_and_skips_blanks() {
        assert_eq!(split_tags(" Dev, Design ,,"), vec!["Dev", "Design"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn empty_updates_are_detected() {
        assert!(ProjectUpdate::default().is_empty());
        assert!(TaskUpdate::default().is_empty());
        let update = TaskUpdate {
            due_date: Some(None),
            ..TaskUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn retrospective_input_normalizes_blanks() {
        let input = RetrospectiveInput {
            keep_content: Some("  pairing  ".into()),
            problem_content: Some("   ".into()),
            try_content: None,
            learning_content: Some("".into()),
        }
        .normalized();
        assert_eq!(input.keep_content.as_deref(), Some("pairing"));
        assert!(input.problem_content.is_none());
        assert!(input.learning_content.is_none());
    }
}
