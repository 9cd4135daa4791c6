//! Domain operations over the persistence gateway.
//!
//! `Tracker` validates input, calls [`Database`], and absorbs persistence
//! failures at this boundary: they are logged and turned into
//! [`CreateOutcome::Failed`], `false`, `None` or an empty list.

pub mod validation;

use crate::auth::{hash_password, password_matches};
use crate::config::DEFAULT_MIN_PASSWORD_LEN;
use crate::db::Database;
use crate::format::today;
use crate::metrics::{ProjectMetrics, project_metrics};
use crate::types::{
    ChecklistItem, Milestone, MilestoneUpdate, NewMilestone, NewProject, NewTask, Project,
    ProjectFilter, ProjectStatus, ProjectUpdate, Retrospective, RetrospectiveInput,
    RetrospectiveSummary, SignupInput, Task, TaskStatus, TaskUpdate, User, non_blank,
};
use serde::Serialize;
use std::sync::Arc;
use validation::{
    validate_estimated_hours, validate_github_url, validate_milestone_input, validate_project_input,
    validate_signup, validate_task_input,
};

/// Result of a create operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Stored; carries the new row id.
    Created(i64),
    /// Rejected by validation; nothing was written.
    Invalid(Vec<String>),
    /// The store failed. Already logged.
    Failed,
}

impl CreateOutcome {
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Created(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    fn from_insert(operation: &str, result: anyhow::Result<i64>) -> Self {
        match result {
            Ok(id) => Self::Created(id),
            Err(e) => {
                tracing::error!(operation, error = %e, "Insert failed");
                Self::Failed
            }
        }
    }
}

/// A project together with the headline metrics of its tasks.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectOverview {
    pub project: Project,
    pub metrics: ProjectMetrics,
}

/// Log a persistence failure and fall back to `fallback`.
fn absorb<T>(operation: &str, result: anyhow::Result<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(operation, error = %e, "Database operation failed");
            fallback
        }
    }
}

#[derive(Clone)]
pub struct Tracker {
    db: Arc<Database>,
    min_password_len: usize,
}

impl Tracker {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }

    pub fn with_min_password_len(mut self, min_password_len: usize) -> Self {
        self.min_password_len = min_password_len;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    /// Create a project. The start date defaults to today.
    pub fn create_project(&self, user_id: Option<i64>, input: NewProject) -> CreateOutcome {
        let project = NewProject {
            name: input.name.trim().to_string(),
            description: non_blank(input.description),
            github_url: non_blank(input.github_url),
            start_date: input.start_date.or_else(|| Some(today())),
            target_end_date: input.target_end_date,
            status: input.status,
        };

        let mut errors =
            validate_project_input(&project.name, project.start_date, project.target_end_date);
        errors.extend(validate_github_url(project.github_url.as_deref()));
        if !errors.is_empty() {
            return CreateOutcome::Invalid(errors);
        }

        let outcome =
            CreateOutcome::from_insert("create_project", self.db.insert_project(user_id, &project));
        if let CreateOutcome::Created(id) = outcome {
            tracing::info!(project_id = id, name = %project.name, "Created project");
        }
        outcome
    }

    pub fn get_project(&self, project_id: i64) -> Option<Project> {
        absorb("get_project", self.db.get_project(project_id), None)
    }

    /// The project, if it exists and belongs to `user_id`.
    pub fn project_for_user(&self, project_id: i64, user_id: i64) -> Option<Project> {
        self.get_project(project_id)
            .filter(|p| p.user_id == Some(user_id))
    }

    pub fn list_projects(&self, filter: ProjectFilter) -> Vec<Project> {
        absorb("list_projects", self.db.list_projects(filter), Vec::new())
    }

    pub fn project_status_counts(&self, user_id: i64) -> Vec<(ProjectStatus, i64)> {
        absorb(
            "project_status_counts",
            self.db.count_projects_by_status(user_id),
            Vec::new(),
        )
    }

    /// Apply a sparse update. Dates are validated against the stored values
    /// they are paired with.
    pub fn update_project(&self, project_id: i64, update: ProjectUpdate) -> Result<bool, Vec<String>> {
        let update = ProjectUpdate {
            name: update.name.map(|n| n.trim().to_string()),
            description: update.description.map(non_blank),
            github_url: update.github_url.map(non_blank),
            ..update
        };
        if update.is_empty() {
            return Ok(false);
        }
        let Some(existing) = self.get_project(project_id) else {
            return Ok(false);
        };

        let name = update.name.as_deref().unwrap_or(&existing.name);
        let start_date = update.start_date.unwrap_or(existing.start_date);
        let target_end_date = update.target_end_date.unwrap_or(existing.target_end_date);
        let mut errors = validate_project_input(name, start_date, target_end_date);
        if let Some(Some(url)) = &update.github_url {
            errors.extend(validate_github_url(Some(url.as_str())));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(absorb(
            "update_project",
            self.db.update_project(project_id, &update),
            false,
        ))
    }

    /// Delete a project with its tasks, milestones and retrospective.
    pub fn delete_project(&self, project_id: i64) -> bool {
        let deleted = absorb("delete_project", self.db.delete_project(project_id), false);
        if deleted {
            tracing::info!(project_id, "Deleted project");
        }
        deleted
    }

    /// The project plus metrics over all of its tasks.
    pub fn project_overview(&self, project_id: i64) -> Option<ProjectOverview> {
        let project = self.get_project(project_id)?;
        let tasks = self.list_tasks(project_id, None);
        Some(ProjectOverview {
            project,
            metrics: project_metrics(&tasks),
        })
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub fn create_task(&self, project_id: i64, input: NewTask) -> CreateOutcome {
        let task = NewTask {
            title: input.title.trim().to_string(),
            description: non_blank(input.description),
            tags: non_blank(input.tags),
            ..input
        };

        let errors = validate_task_input(&task.title, task.estimated_hours);
        if !errors.is_empty() {
            return CreateOutcome::Invalid(errors);
        }

        CreateOutcome::from_insert("create_task", self.db.insert_task(project_id, &task))
    }

    /// Create a todo task of medium priority from a title alone.
    pub fn quick_add_task(&self, project_id: i64, title: &str) -> CreateOutcome {
        self.create_task(project_id, NewTask::titled(title))
    }

    pub fn get_task(&self, task_id: i64) -> Option<Task> {
        absorb("get_task", self.db.get_task(task_id), None)
    }

    pub fn list_tasks(&self, project_id: i64, status: Option<TaskStatus>) -> Vec<Task> {
        absorb("list_tasks", self.db.list_tasks(project_id, status), Vec::new())
    }

    pub fn count_tasks(&self, project_id: i64, status: Option<TaskStatus>) -> usize {
        let count = absorb("count_tasks", self.db.count_tasks(project_id, status), 0);
        usize::try_from(count).unwrap_or(0)
    }

    /// Apply a sparse update. A status change stamps timestamps the same way
    /// [`Tracker::transition_task`] does.
    pub fn update_task(&self, task_id: i64, update: TaskUpdate) -> Result<bool, Vec<String>> {
        let update = TaskUpdate {
            title: update.title.map(|t| t.trim().to_string()),
            description: update.description.map(non_blank),
            tags: update.tags.map(non_blank),
            ..update
        };
        if update.is_empty() {
            return Ok(false);
        }

        let mut errors = Vec::new();
        if let Some(ref title) = update.title {
            errors.extend(validate_task_input(title, None));
        }
        if let Some(hours) = update.estimated_hours {
            errors.extend(validate_estimated_hours(hours));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(absorb("update_task", self.db.update_task(task_id, &update), false))
    }

    /// Move a task to `status`.
    ///
    /// Entering in_progress stamps started_at the first time only; entering
    /// done from another status stamps completed_at. Moving back clears nothing.
    pub fn transition_task(&self, task_id: i64, status: TaskStatus) -> bool {
        let moved = absorb(
            "transition_task",
            self.db.set_task_status(task_id, status),
            false,
        );
        if moved {
            tracing::debug!(task_id, status = status.as_str(), "Task status changed");
        }
        moved
    }

    pub fn delete_task(&self, task_id: i64) -> bool {
        absorb("delete_task", self.db.delete_task(task_id), false)
    }

    // ------------------------------------------------------------------
    // Checklist
    // ------------------------------------------------------------------

    pub fn add_checklist_item(&self, task_id: i64, content: &str) -> CreateOutcome {
        let content = content.trim();
        if content.is_empty() {
            return CreateOutcome::Invalid(vec!["Checklist item is empty".to_string()]);
        }
        CreateOutcome::from_insert(
            "add_checklist_item",
            self.db.insert_checklist_item(task_id, content, false),
        )
    }

    /// Add one unchecked item per non-blank line of `text`. Returns how many
    /// were stored.
    pub fn add_checklist_items(&self, task_id: i64, text: &str) -> usize {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| self.add_checklist_item(task_id, line).is_created())
            .count()
    }

    pub fn list_checklist_items(&self, task_id: i64) -> Vec<ChecklistItem> {
        absorb(
            "list_checklist_items",
            self.db.list_checklist_items(task_id),
            Vec::new(),
        )
    }

    pub fn set_checklist_item_checked(&self, item_id: i64, is_checked: bool) -> bool {
        absorb(
            "set_checklist_item_checked",
            self.db.set_checklist_item_checked(item_id, is_checked),
            false,
        )
    }

    /// Task owning a checklist item.
    pub fn checklist_item_task(&self, item_id: i64) -> Option<i64> {
        absorb(
            "checklist_item_task",
            self.db.checklist_item_task(item_id),
            None,
        )
    }

    pub fn delete_checklist_item(&self, item_id: i64) -> bool {
        absorb(
            "delete_checklist_item",
            self.db.delete_checklist_item(item_id),
            false,
        )
    }

    // ------------------------------------------------------------------
    // Milestones
    // ------------------------------------------------------------------

    pub fn create_milestone(&self, project_id: i64, input: NewMilestone) -> CreateOutcome {
        let milestone = NewMilestone {
            title: input.title.trim().to_string(),
            description: non_blank(input.description),
            target_date: input.target_date,
        };

        let errors = validate_milestone_input(&milestone.title, milestone.target_date);
        if !errors.is_empty() {
            return CreateOutcome::Invalid(errors);
        }

        CreateOutcome::from_insert(
            "create_milestone",
            self.db.insert_milestone(project_id, &milestone),
        )
    }

    pub fn get_milestone(&self, milestone_id: i64) -> Option<Milestone> {
        absorb("get_milestone", self.db.get_milestone(milestone_id), None)
    }

    /// Milestones of a project, earliest target date first.
    pub fn list_milestones(&self, project_id: i64) -> Vec<Milestone> {
        absorb("list_milestones", self.db.list_milestones(project_id), Vec::new())
    }

    pub fn update_milestone(
        &self,
        milestone_id: i64,
        update: MilestoneUpdate,
    ) -> Result<bool, Vec<String>> {
        let update = MilestoneUpdate {
            title: update.title.map(|t| t.trim().to_string()),
            description: update.description.map(non_blank),
            ..update
        };
        if update.is_empty() {
            return Ok(false);
        }
        if let Some(ref title) = update.title
            && title.is_empty()
        {
            return Err(vec!["Milestone title is required".to_string()]);
        }

        Ok(absorb(
            "update_milestone",
            self.db.update_milestone(milestone_id, &update),
            false,
        ))
    }

    /// Completing stamps completed_at; reopening clears it.
    pub fn set_milestone_completed(&self, milestone_id: i64, is_completed: bool) -> bool {
        absorb(
            "set_milestone_completed",
            self.db.set_milestone_completed(milestone_id, is_completed),
            false,
        )
    }

    pub fn delete_milestone(&self, milestone_id: i64) -> bool {
        absorb("delete_milestone", self.db.delete_milestone(milestone_id), false)
    }

    // ------------------------------------------------------------------
    // Retrospectives
    // ------------------------------------------------------------------

    /// Create the project's retrospective. Rejected if one already exists.
    pub fn create_retrospective(&self, project_id: i64, input: RetrospectiveInput) -> CreateOutcome {
        match self.db.get_retrospective(project_id) {
            Ok(Some(_)) => {
                return CreateOutcome::Invalid(vec![
                    "This project already has a retrospective".to_string(),
                ]);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(operation = "create_retrospective", error = %e, "Lookup failed");
                return CreateOutcome::Failed;
            }
        }

        CreateOutcome::from_insert(
            "create_retrospective",
            self.db.insert_retrospective(project_id, &input.normalized()),
        )
    }

    pub fn get_retrospective(&self, project_id: i64) -> Option<Retrospective> {
        absorb("get_retrospective", self.db.get_retrospective(project_id), None)
    }

    /// Overwrite the four fields. False if the project has no retrospective yet.
    pub fn update_retrospective(&self, project_id: i64, input: RetrospectiveInput) -> bool {
        absorb(
            "update_retrospective",
            self.db.update_retrospective(project_id, &input.normalized()),
            false,
        )
    }

    /// Create the retrospective on first save, update it afterwards.
    pub fn save_retrospective(&self, project_id: i64, input: RetrospectiveInput) -> bool {
        if self.get_retrospective(project_id).is_some() {
            self.update_retrospective(project_id, input)
        } else {
            self.create_retrospective(project_id, input).is_created()
        }
    }

    /// Retrospectives with their project names, newest first. `None` lists all owners.
    pub fn list_retrospectives(&self, user_id: Option<i64>) -> Vec<RetrospectiveSummary> {
        absorb(
            "list_retrospectives",
            self.db.list_retrospectives(user_id),
            Vec::new(),
        )
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub fn get_user(&self, user_id: i64) -> Option<User> {
        absorb("get_user", self.db.get_user(user_id), None)
    }

    /// Check credentials. Unknown email and wrong password both give `None`.
    pub fn login(&self, email: &str, password: &str) -> Option<User> {
        let user = absorb(
            "login",
            self.db.get_user_by_email(email.trim()),
            None,
        )?;
        if !password_matches(password, &user.password_hash) {
            return None;
        }
        absorb("login", self.db.touch_last_login(user.id), false);
        tracing::info!(user_id = user.id, "User logged in");
        Some(user)
    }

    pub fn signup(&self, input: SignupInput) -> CreateOutcome {
        let errors = validate_signup(&input, self.min_password_len);
        if !errors.is_empty() {
            return CreateOutcome::Invalid(errors);
        }

        let email = input.email.trim();
        match self.db.get_user_by_email(email) {
            Ok(Some(_)) => {
                return CreateOutcome::Invalid(vec![
                    "This email is already registered".to_string(),
                ]);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(operation = "signup", error = %e, "Lookup failed");
                return CreateOutcome::Failed;
            }
        }

        let outcome = CreateOutcome::from_insert(
            "signup",
            self.db
                .insert_user(email, &hash_password(&input.password), input.username.trim()),
        );
        if let CreateOutcome::Created(id) = outcome {
            tracing::info!(user_id = id, "User signed up");
        }
        outcome
    }
}
