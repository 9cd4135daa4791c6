//! Per-request view state carried in the query string.
//!
//! Which project is selected, which tab is open, which task or dialog is
//! showing: all of it lives in the URL, so every page is reproducible from
//! its link and nothing is kept on the server between requests.

use crate::types::ProjectStatus;
use serde::Deserialize;

/// Tab shown for the selected project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Dashboard,
    Board,
    Retrospective,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Self::Dashboard, Self::Board, Self::Retrospective];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Board => "board",
            Self::Retrospective => "retrospective",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dashboard" => Some(Self::Dashboard),
            "board" => Some(Self::Board),
            "retrospective" => Some(Self::Retrospective),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Dashboard => "📊 Dashboard",
            Self::Board => "📋 Board",
            Self::Retrospective => "💭 Retrospective",
        }
    }
}

/// What the task panel or project header is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    View,
    Edit,
    /// Confirmation before deleting the selected project.
    Delete,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "view" => Some(Self::View),
            "edit" => Some(Self::Edit),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Raw query parameters of the main page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    pub project: Option<i64>,
    pub tab: Option<String>,
    pub task: Option<i64>,
    pub mode: Option<String>,
    pub status: Option<String>,
    pub new: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub project: Option<i64>,
    pub tab: Tab,
    /// Task whose detail panel is open.
    pub task: Option<i64>,
    pub mode: Mode,
    /// Sidebar filter on project status.
    pub status_filter: Option<ProjectStatus>,
    /// The create-project form is open.
    pub new_project: bool,
}

impl From<ViewQuery> for ViewState {
    /// Unknown values fall back to defaults instead of failing the request.
    fn from(query: ViewQuery) -> Self {
        Self {
            project: query.project,
            tab: query
                .tab
                .as_deref()
                .and_then(Tab::from_str)
                .unwrap_or_default(),
            task: query.task,
            mode: query
                .mode
                .as_deref()
                .and_then(Mode::from_str)
                .unwrap_or_default(),
            status_filter: query.status.as_deref().and_then(ProjectStatus::from_str),
            new_project: query.new.as_deref() == Some("project"),
        }
    }
}

impl ViewState {
    pub fn for_project(project_id: i64) -> Self {
        Self {
            project: Some(project_id),
            ..Self::default()
        }
    }

    pub fn with_tab(mut self, tab: Tab) -> Self {
        self.tab = tab;
        self
    }

    pub fn with_task(mut self, task_id: i64, mode: Mode) -> Self {
        self.tab = Tab::Board;
        self.task = Some(task_id);
        self.mode = mode;
        self
    }

    pub fn without_task(mut self) -> Self {
        self.task = None;
        self.mode = Mode::View;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_status_filter(mut self, status: Option<ProjectStatus>) -> Self {
        self.status_filter = status;
        self
    }

    pub fn with_new_project(mut self) -> Self {
        self.new_project = true;
        self
    }

    /// Link to the main page showing this state. Default values are left out.
    pub fn href(&self) -> String {
        let mut params: Vec<String> = Vec::new();
        if let Some(project) = self.project {
            params.push(format!("project={}", project));
        }
        if self.tab != Tab::default() {
            params.push(format!("tab={}", self.tab.as_str()));
        }
        if let Some(task) = self.task {
            params.push(format!("task={}", task));
        }
        if self.mode != Mode::default() {
            params.push(format!("mode={}", self.mode.as_str()));
        }
        if let Some(status) = self.status_filter {
            params.push(format!("status={}", status.as_str()));
        }
        if self.new_project {
            params.push("new=project".to_string());
        }

        if params.is_empty() {
            "/".to_string()
        } else {
            format!("/?{}", params.join("&"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_links_to_root() {
        assert_eq!(ViewState::default().href(), "/");
    }

    #[test]
    fn href_includes_only_non_default_values() {
        let view = ViewState::for_project(4).with_task(9, Mode::Edit);
        assert_eq!(view.href(), "/?project=4&tab=board&task=9&mode=edit");

        let view = ViewState::default()
            .with_status_filter(Some(ProjectStatus::OnHold))
            .with_new_project();
        assert_eq!(view.href(), "/?status=on_hold&new=project");
    }

    #[test]
    fn query_parses_into_state() {
        let query = ViewQuery {
            project: Some(2),
            tab: Some("retrospective".into()),
            status: Some("completed".into()),
            ..ViewQuery::default()
        };
        let view = ViewState::from(query);
        assert_eq!(view.project, Some(2));
        assert_eq!(view.tab, Tab::Retrospective);
        assert_eq!(view.status_filter, Some(ProjectStatus::Completed));
        assert!(!view.new_project);
    }

    #[test]
    fn unknown_query_values_fall_back() {
        let query = ViewQuery {
            tab: Some("gantt".into()),
            mode: Some("explode".into()),
            status: Some("archived".into()),
            new: Some("task".into()),
            ..ViewQuery::default()
        };
        assert_eq!(ViewState::from(query), ViewState::default());
    }

    #[test]
    fn state_round_trips_through_href_values() {
        let view = ViewState::for_project(1)
            .with_tab(Tab::Retrospective)
            .with_mode(Mode::Delete);
        assert_eq!(view.href(), "/?project=1&tab=retrospective&mode=delete");
        assert_eq!(view.clone().without_task().mode, Mode::View);
    }
}
