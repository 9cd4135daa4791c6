//! HTTP server implementation for the web dashboard.
//!
//! Pages are rendered on the server. Form posts either redirect back to the
//! page they came from (POST/redirect/GET) or re-render it with validation
//! messages.

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::pages;
use super::session::{self, CurrentUser};
use super::view_state::{Mode, Tab, ViewQuery, ViewState};
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::metrics::{
    PriorityDistribution, ProgressPoint, ProjectMetrics, StatusDistribution, TagCount,
    priority_distribution, progress_history, project_metrics, status_distribution,
    tag_distribution,
};
use crate::tracker::{CreateOutcome, Tracker};
use crate::types::{
    NewMilestone, NewProject, NewTask, Priority, Project, ProjectStatus, ProjectUpdate,
    RetrospectiveInput, SignupInput, Task, TaskStatus, TaskUpdate, User, non_blank,
};

const SAVE_FAILED: &str = "Could not save your changes. Please try again.";

/// Dashboard server state shared across handlers.
#[derive(Clone)]
pub struct DashboardServer {
    tracker: Tracker,
    auth: Arc<AuthConfig>,
}

impl DashboardServer {
    pub fn new(tracker: Tracker, auth: AuthConfig) -> Self {
        Self {
            tracker,
            auth: Arc::new(auth),
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    /// The project if it exists and belongs to `user`.
    fn owned_project(&self, user: &User, project_id: i64) -> Option<Project> {
        self.tracker.project_for_user(project_id, user.id)
    }

    /// The task if its project belongs to `user`.
    fn owned_task(&self, user: &User, task_id: i64) -> Option<Task> {
        let task = self.tracker.get_task(task_id)?;
        self.owned_project(user, task.project_id)?;
        Some(task)
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn render_main(state: &DashboardServer, user: &User, view: &ViewState, errors: &[String]) -> Response {
    let html = pages::main_page(&state.tracker, user, view, errors);
    if errors.is_empty() {
        Html(html).into_response()
    } else {
        (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
    }
}

fn redirect_to(view: &ViewState) -> Response {
    Redirect::to(&view.href()).into_response()
}

/// Errors from a create call, or the redirect on success.
fn created_or(outcome: CreateOutcome, on_created: impl FnOnce(i64) -> Response) -> Result<Response, Vec<String>> {
    match outcome {
        CreateOutcome::Created(id) => Ok(on_created(id)),
        CreateOutcome::Invalid(errors) => Err(errors),
        CreateOutcome::Failed => Err(vec![SAVE_FAILED.to_string()]),
    }
}

// ----------------------------------------------------------------------
// Form parsing
// ----------------------------------------------------------------------

/// Empty input is `None`; anything else must be `YYYY-MM-DD`.
fn parse_date(label: &str, value: &str, errors: &mut Vec<String>) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(format!("{} is not a valid date", label));
            None
        }
    }
}

fn parse_hours(value: &str, errors: &mut Vec<String>) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<f64>() {
        Ok(hours) => Some(hours),
        Err(_) => {
            errors.push("Estimated hours must be a non-negative number".to_string());
            None
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "true" | "1" | "on")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectForm {
    name: String,
    description: String,
    github_url: String,
    start_date: String,
    target_end_date: String,
    status: String,
}

impl ProjectForm {
    fn dates(&self, errors: &mut Vec<String>) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (
            parse_date("Start date", &self.start_date, errors),
            parse_date("Target end date", &self.target_end_date, errors),
        )
    }

    fn status(&self) -> Option<ProjectStatus> {
        ProjectStatus::from_str(self.status.trim())
    }

    fn into_new_project(self, errors: &mut Vec<String>) -> NewProject {
        let (start_date, target_end_date) = self.dates(errors);
        NewProject {
            status: self.status(),
            name: self.name,
            description: non_blank(Some(self.description)),
            github_url: non_blank(Some(self.github_url)),
            start_date,
            target_end_date,
        }
    }

    fn into_update(self, errors: &mut Vec<String>) -> ProjectUpdate {
        let (start_date, target_end_date) = self.dates(errors);
        ProjectUpdate {
            status: self.status(),
            name: Some(self.name),
            description: Some(non_blank(Some(self.description))),
            github_url: Some(non_blank(Some(self.github_url))),
            start_date: Some(start_date),
            target_end_date: Some(target_end_date),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaskForm {
    /// Set by the quick-add form: only the title is used.
    quick: Option<String>,
    title: String,
    description: String,
    status: String,
    priority: String,
    tags: String,
    estimated_hours: String,
    due_date: String,
    /// New checklist items, one per line. Edit form only.
    checklist: String,
}

impl TaskForm {
    fn into_new_task(self, errors: &mut Vec<String>) -> NewTask {
        NewTask {
            estimated_hours: parse_hours(&self.estimated_hours, errors),
            due_date: parse_date("Due date", &self.due_date, errors),
            status: TaskStatus::from_str(&self.status).unwrap_or_default(),
            priority: Priority::from_str(&self.priority).unwrap_or_default(),
            title: self.title,
            description: non_blank(Some(self.description)),
            tags: non_blank(Some(self.tags)),
        }
    }

    fn to_update(&self, errors: &mut Vec<String>) -> TaskUpdate {
        TaskUpdate {
            title: Some(self.title.clone()),
            description: Some(non_blank(Some(self.description.clone()))),
            status: TaskStatus::from_str(&self.status),
            priority: Priority::from_str(&self.priority),
            tags: Some(non_blank(Some(self.tags.clone()))),
            estimated_hours: Some(parse_hours(&self.estimated_hours, errors)),
            due_date: Some(parse_date("Due date", &self.due_date, errors)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusForm {
    /// A status name, or `next` for the card's advance button.
    status: String,
}

#[derive(Debug, Deserialize)]
struct CheckedForm {
    checked: String,
}

#[derive(Debug, Deserialize)]
struct CompletedForm {
    completed: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MilestoneForm {
    title: String,
    description: String,
    target_date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginForm {
    email: String,
    password: String,
    remember: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoginQuery {
    registered: Option<String>,
}

// ----------------------------------------------------------------------
// Authentication pages
// ----------------------------------------------------------------------

async fn login_page(
    State(state): State<DashboardServer>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    if session::authenticate(&headers, &state).is_some() {
        return Redirect::to("/").into_response();
    }
    let notice = query
        .registered
        .map(|_| "Account created. Please log in.");
    Html(pages::login_page(&[], "", notice)).into_response()
}

async fn login_submit(State(state): State<DashboardServer>, Form(form): Form<LoginForm>) -> Response {
    if form.email.trim().is_empty() || form.password.is_empty() {
        let errors = vec!["Enter your email and password".to_string()];
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(pages::login_page(&errors, &form.email, None)),
        )
            .into_response();
    }

    match state.tracker.login(&form.email, &form.password) {
        Some(user) => {
            let max_age = form
                .remember
                .is_some()
                .then(|| state.auth.remember_max_age_secs());
            let cookies = session::login_cookies(&user, &state.auth.remember_secret, max_age);
            (AppendHeaders(cookies), Redirect::to("/")).into_response()
        }
        None => {
            let errors = vec!["Invalid email or password".to_string()];
            (
                StatusCode::UNAUTHORIZED,
                Html(pages::login_page(&errors, &form.email, None)),
            )
                .into_response()
        }
    }
}

async fn signup_page() -> Html<String> {
    Html(pages::signup_page(&[], "", ""))
}

async fn signup_submit(State(state): State<DashboardServer>, Form(form): Form<SignupInput>) -> Response {
    let username = form.username.clone();
    let email = form.email.clone();
    match created_or(state.tracker.signup(form), |_| {
        Redirect::to("/login?registered=1").into_response()
    }) {
        Ok(response) => response,
        Err(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(pages::signup_page(&errors, &username, &email)),
        )
            .into_response(),
    }
}

async fn logout() -> impl IntoResponse {
    (AppendHeaders(session::logout_cookies()), Redirect::to("/login"))
}

// ----------------------------------------------------------------------
// Main page and projects
// ----------------------------------------------------------------------

async fn index(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ViewQuery>,
) -> Response {
    render_main(&state, &user, &ViewState::from(query), &[])
}

async fn create_project(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ProjectForm>,
) -> Response {
    let mut errors = Vec::new();
    let input = form.into_new_project(&mut errors);
    if errors.is_empty() {
        match created_or(state.tracker.create_project(Some(user.id), input), |id| {
            redirect_to(&ViewState::for_project(id))
        }) {
            Ok(response) => return response,
            Err(e) => errors = e,
        }
    }
    render_main(&state, &user, &ViewState::default().with_new_project(), &errors)
}

async fn update_project(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
    Form(form): Form<ProjectForm>,
) -> Response {
    if state.owned_project(&user, project_id).is_none() {
        return Redirect::to("/").into_response();
    }
    let view = ViewState::for_project(project_id);

    let mut errors = Vec::new();
    let update = form.into_update(&mut errors);
    if errors.is_empty() {
        match state.tracker.update_project(project_id, update) {
            Ok(true) => return redirect_to(&view),
            Ok(false) => errors.push(SAVE_FAILED.to_string()),
            Err(e) => errors = e,
        }
    }
    render_main(&state, &user, &view.with_mode(Mode::Edit), &errors)
}

async fn delete_project(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
) -> Response {
    if state.owned_project(&user, project_id).is_some() {
        state.tracker.delete_project(project_id);
    }
    Redirect::to("/").into_response()
}

// ----------------------------------------------------------------------
// Tasks and checklist
// ----------------------------------------------------------------------

async fn create_task(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
    Form(form): Form<TaskForm>,
) -> Response {
    if state.owned_project(&user, project_id).is_none() {
        return Redirect::to("/").into_response();
    }
    let board = ViewState::for_project(project_id).with_tab(Tab::Board);

    let mut errors = Vec::new();
    let outcome = if form.quick.is_some() {
        state.tracker.quick_add_task(project_id, &form.title)
    } else {
        let input = form.into_new_task(&mut errors);
        if !errors.is_empty() {
            return render_main(&state, &user, &board, &errors);
        }
        state.tracker.create_task(project_id, input)
    };

    match created_or(outcome, |_| redirect_to(&board)) {
        Ok(response) => response,
        Err(errors) => render_main(&state, &user, &board, &errors),
    }
}

async fn update_task(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<i64>,
    Form(form): Form<TaskForm>,
) -> Response {
    let Some(task) = state.owned_task(&user, task_id) else {
        return Redirect::to("/").into_response();
    };
    let view = ViewState::for_project(task.project_id).with_task(task_id, Mode::View);

    let mut errors = Vec::new();
    let update = form.to_update(&mut errors);
    if errors.is_empty() {
        match state.tracker.update_task(task_id, update) {
            Ok(true) => {
                let added = state.tracker.add_checklist_items(task_id, &form.checklist);
                if added > 0 {
                    tracing::debug!(task_id, added, "Added checklist items");
                }
                return redirect_to(&view);
            }
            Ok(false) => errors.push(SAVE_FAILED.to_string()),
            Err(e) => errors = e,
        }
    }
    render_main(&state, &user, &view.with_mode(Mode::Edit), &errors)
}

async fn change_task_status(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> Response {
    let Some(task) = state.owned_task(&user, task_id) else {
        return Redirect::to("/").into_response();
    };
    let status = match form.status.as_str() {
        "next" => Some(task.status.next()),
        other => TaskStatus::from_str(other),
    };
    if let Some(status) = status {
        state.tracker.transition_task(task_id, status);
    }
    redirect_to(&ViewState::for_project(task.project_id).with_tab(Tab::Board))
}

async fn delete_task(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<i64>,
) -> Response {
    let Some(task) = state.owned_task(&user, task_id) else {
        return Redirect::to("/").into_response();
    };
    state.tracker.delete_task(task_id);
    redirect_to(&ViewState::for_project(task.project_id).with_tab(Tab::Board))
}

async fn toggle_checklist_item(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<i64>,
    Form(form): Form<CheckedForm>,
) -> Response {
    let Some(task) = state
        .tracker
        .checklist_item_task(item_id)
        .and_then(|task_id| state.owned_task(&user, task_id))
    else {
        return Redirect::to("/").into_response();
    };
    state
        .tracker
        .set_checklist_item_checked(item_id, parse_flag(&form.checked));
    redirect_to(&ViewState::for_project(task.project_id).with_task(task.id, Mode::View))
}

async fn delete_checklist_item(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<i64>,
) -> Response {
    let Some(task) = state
        .tracker
        .checklist_item_task(item_id)
        .and_then(|task_id| state.owned_task(&user, task_id))
    else {
        return Redirect::to("/").into_response();
    };
    state.tracker.delete_checklist_item(item_id);
    redirect_to(&ViewState::for_project(task.project_id).with_task(task.id, Mode::View))
}

// ----------------------------------------------------------------------
// Milestones and retrospective
// ----------------------------------------------------------------------

async fn create_milestone(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
    Form(form): Form<MilestoneForm>,
) -> Response {
    if state.owned_project(&user, project_id).is_none() {
        return Redirect::to("/").into_response();
    }
    let view = ViewState::for_project(project_id);

    let mut errors = Vec::new();
    let target_date = parse_date("Target date", &form.target_date, &mut errors);
    if errors.is_empty() {
        let input = NewMilestone {
            title: form.title,
            description: non_blank(Some(form.description)),
            target_date,
        };
        match created_or(state.tracker.create_milestone(project_id, input), |_| {
            redirect_to(&view)
        }) {
            Ok(response) => return response,
            Err(e) => errors = e,
        }
    }
    render_main(&state, &user, &view, &errors)
}

/// The milestone's project id if the project belongs to `user`.
fn owned_milestone_project(state: &DashboardServer, user: &User, milestone_id: i64) -> Option<i64> {
    let milestone = state.tracker.get_milestone(milestone_id)?;
    state
        .owned_project(user, milestone.project_id)
        .map(|p| p.id)
}

async fn toggle_milestone(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(milestone_id): Path<i64>,
    Form(form): Form<CompletedForm>,
) -> Response {
    let Some(project_id) = owned_milestone_project(&state, &user, milestone_id) else {
        return Redirect::to("/").into_response();
    };
    state
        .tracker
        .set_milestone_completed(milestone_id, parse_flag(&form.completed));
    redirect_to(&ViewState::for_project(project_id))
}

async fn delete_milestone(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(milestone_id): Path<i64>,
) -> Response {
    let Some(project_id) = owned_milestone_project(&state, &user, milestone_id) else {
        return Redirect::to("/").into_response();
    };
    state.tracker.delete_milestone(milestone_id);
    redirect_to(&ViewState::for_project(project_id))
}

async fn save_retrospective(
    State(state): State<DashboardServer>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<i64>,
    Form(form): Form<RetrospectiveInput>,
) -> Response {
    if state.owned_project(&user, project_id).is_none() {
        return Redirect::to("/").into_response();
    }
    let view = ViewState::for_project(project_id).with_tab(Tab::Retrospective);
    if state.tracker.save_retrospective(project_id, form) {
        redirect_to(&view)
    } else {
        render_main(&state, &user, &view, &[SAVE_FAILED.to_string()])
    }
}

// ----------------------------------------------------------------------
// JSON API
// ----------------------------------------------------------------------

/// Everything the dashboard tab shows, as JSON.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub project: Project,
    pub metrics: ProjectMetrics,
    pub status: StatusDistribution,
    pub priority: PriorityDistribution,
    pub tags: Vec<TagCount>,
    pub history: Vec<ProgressPoint>,
}

async fn api_project_metrics(
    State(state): State<DashboardServer>,
    headers: HeaderMap,
    Path(project_id): Path<i64>,
) -> AppResult<Json<MetricsResponse>> {
    let user = session::authenticate(&headers, &state).ok_or_else(AppError::not_authenticated)?;
    let db = state.tracker.db();
    let project = db
        .get_project(project_id)?
        .filter(|project| project.user_id == Some(user.id))
        .ok_or_else(|| AppError::project_not_found(project_id))?;

    let tasks = db.list_tasks(project_id, None)?;
    Ok(Json(MetricsResponse {
        project,
        metrics: project_metrics(&tasks),
        status: status_distribution(&tasks),
        priority: priority_distribution(&tasks),
        tags: tag_distribution(&tasks),
        history: progress_history(&tasks),
    }))
}

/// Build the router with all routes.
pub fn build_router(state: DashboardServer) -> Router {
    Router::new()
        // Pages
        .route("/", get(index))
        .route("/login", get(login_page).post(login_submit))
        .route("/signup", get(signup_page).post(signup_submit))
        .route("/logout", post(logout))
        // Projects
        .route("/projects", post(create_project))
        .route("/projects/{project_id}", post(update_project))
        .route("/projects/{project_id}/delete", post(delete_project))
        .route("/projects/{project_id}/tasks", post(create_task))
        .route("/projects/{project_id}/milestones", post(create_milestone))
        .route(
            "/projects/{project_id}/retrospective",
            post(save_retrospective),
        )
        // Tasks
        .route("/tasks/{task_id}", post(update_task))
        .route("/tasks/{task_id}/status", post(change_task_status))
        .route("/tasks/{task_id}/delete", post(delete_task))
        .route("/checklist/{item_id}/toggle", post(toggle_checklist_item))
        .route("/checklist/{item_id}/delete", post(delete_checklist_item))
        .route("/milestones/{milestone_id}/toggle", post(toggle_milestone))
        .route("/milestones/{milestone_id}/delete", post(delete_milestone))
        // API routes
        .route("/api/projects/{project_id}/metrics", get(api_project_metrics))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve the dashboard in a background task.
///
/// Returns a sender that shuts the server down gracefully, and the bound
/// address (useful when `addr` asks for port 0).
pub async fn start_server(
    state: DashboardServer,
    addr: &str,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Dashboard listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Dashboard shutting down");
            })
            .await
        {
            tracing::error!("Dashboard server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.1.0",
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("0.1.0"));
    }

    #[test]
    fn blank_dates_are_absent_and_bad_ones_reported() {
        let mut errors = Vec::new();
        assert_eq!(parse_date("Due date", "  ", &mut errors), None);
        assert_eq!(
            parse_date("Due date", "2024-03-01", &mut errors),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert!(errors.is_empty());

        assert_eq!(parse_date("Due date", "03/01/2024", &mut errors), None);
        assert_eq!(errors, vec!["Due date is not a valid date"]);
    }

    #[test]
    fn hours_must_be_numeric() {
        let mut errors = Vec::new();
        assert_eq!(parse_hours("2.5", &mut errors), Some(2.5));
        assert_eq!(parse_hours("", &mut errors), None);
        assert!(errors.is_empty());
        assert_eq!(parse_hours("two", &mut errors), None);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn project_form_maps_blank_fields_to_none() {
        let form = ProjectForm {
            name: "Demo".into(),
            github_url: "  ".into(),
            status: "on_hold".into(),
            ..ProjectForm::default()
        };
        let mut errors = Vec::new();
        let input = form.into_new_project(&mut errors);
        assert!(errors.is_empty());
        assert_eq!(input.github_url, None);
        assert_eq!(input.start_date, None);
        assert_eq!(input.status, Some(ProjectStatus::OnHold));
    }

    #[test]
    fn task_update_carries_every_field() {
        let form = TaskForm {
            title: "Write spec".into(),
            status: "done".into(),
            priority: "high".into(),
            tags: "Dev, Docs".into(),
            ..TaskForm::default()
        };
        let mut errors = Vec::new();
        let update = form.to_update(&mut errors);
        assert!(errors.is_empty());
        assert_eq!(update.status, Some(TaskStatus::Done));
        assert_eq!(update.priority, Some(Priority::High));
        assert_eq!(update.tags, Some(Some("Dev, Docs".to_string())));
        assert_eq!(update.due_date, Some(None));
    }
}
