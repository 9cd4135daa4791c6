//! Server-rendered pages.
//!
//! Each function returns a complete HTML document or a fragment of one. Data
//! is read through [`Tracker`]; every user-supplied string goes through
//! [`html_escape`] before it is written into markup.

use super::templates::{html_escape, render_page};
use super::view_state::{Mode, Tab, ViewState};
use crate::db::now_ms;
use crate::format::{
    date_range_text, due_date_badge, format_date, format_datetime, format_hours,
    github_repo_name, priority_badge, relative_time, status_icon, status_label, tag_icons,
    today, truncate_text,
};
use crate::metrics::{
    TagCount, priority_distribution, progress_history, project_metrics, status_distribution,
    tag_distribution,
};
use crate::tracker::Tracker;
use crate::tracker::validation::is_web_url;
use crate::types::{
    ChecklistItem, Milestone, Priority, Project, ProjectFilter, ProjectStatus, Retrospective,
    Task, TaskStatus, User,
};

fn messages_html(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", html_escape(e)))
        .collect();
    format!(r#"<div class="message message-error"><ul>{}</ul></div>"#, items)
}

fn date_input_value(date: Option<chrono::NaiveDate>) -> String {
    date.map(format_date).unwrap_or_default()
}

fn bar_row(label: &str, count: usize, total: usize, class: &str) -> String {
    let width = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    };
    format!(
        r#"<div class="bar-row"><span>{}</span><div class="bar {}"><span style="width:{:.1}%"></span></div><span>{}</span></div>"#,
        label, class, width, count
    )
}

// ----------------------------------------------------------------------
// Login and signup
// ----------------------------------------------------------------------

pub fn login_page(errors: &[String], email: &str, notice: Option<&str>) -> String {
    let notice = notice
        .map(|n| {
            format!(
                r#"<div class="message message-success">{}</div>"#,
                html_escape(n)
            )
        })
        .unwrap_or_default();
    let body = format!(
        r#"<div class="auth-box">
    <h1>🗂️ Project Tracker</h1>
    <p class="muted">Log in to manage your projects.</p>
    {notice}{errors}
    <form class="stacked" method="post" action="/login">
        <label for="email">Email</label>
        <input type="email" id="email" name="email" value="{email}" required>
        <label for="password">Password</label>
        <input type="password" id="password" name="password" required>
        <p><label><input type="checkbox" name="remember" value="on"> Remember me</label></p>
        <button class="primary" type="submit">Log in</button>
    </form>
    <p class="muted">No account yet? <a href="/signup">Sign up</a></p>
</div>"#,
        notice = notice,
        errors = messages_html(errors),
        email = html_escape(email),
    );
    render_page("Log in", &body)
}

pub fn signup_page(errors: &[String], username: &str, email: &str) -> String {
    let body = format!(
        r#"<div class="auth-box">
    <h1>Create an account</h1>
    {errors}
    <form class="stacked" method="post" action="/signup">
        <label for="username">Name</label>
        <input type="text" id="username" name="username" value="{username}">
        <label for="email">Email</label>
        <input type="email" id="email" name="email" value="{email}">
        <label for="password">Password</label>
        <input type="password" id="password" name="password">
        <label for="password_confirm">Confirm password</label>
        <input type="password" id="password_confirm" name="password_confirm">
        <p><button class="primary" type="submit">Sign up</button></p>
    </form>
    <p class="muted">Already registered? <a href="/login">Log in</a></p>
</div>"#,
        errors = messages_html(errors),
        username = html_escape(username),
        email = html_escape(email),
    );
    render_page("Sign up", &body)
}

// ----------------------------------------------------------------------
// Main page
// ----------------------------------------------------------------------

/// The main page for `view`, with `errors` shown above the active form.
pub fn main_page(tracker: &Tracker, user: &User, view: &ViewState, errors: &[String]) -> String {
    let projects = tracker.list_projects(ProjectFilter {
        status: view.status_filter,
        user_id: Some(user.id),
    });
    let selected = view
        .project
        .and_then(|id| tracker.project_for_user(id, user.id));

    let content = if view.new_project {
        project_form_html(None, view, errors)
    } else if let Some(ref project) = selected {
        project_html(tracker, project, view, errors)
    } else if view.project.is_some() {
        r#"<div class="empty-state">Project not found.</div>"#.to_string()
    } else {
        home_html(tracker, user, &projects, view, errors)
    };

    let title = selected
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or("Projects");
    let body = format!(
        r#"<div class="layout"><aside class="sidebar">{}</aside><main class="main">{}</main></div>"#,
        sidebar_html(tracker, user, view, &projects),
        content
    );
    render_page(title, &body)
}

fn sidebar_html(tracker: &Tracker, user: &User, view: &ViewState, projects: &[Project]) -> String {
    let counts = tracker.project_status_counts(user.id);
    let count_of = |status: ProjectStatus| {
        counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };
    let all_count: i64 = counts.iter().map(|(_, n)| n).sum();

    let mut filters = format!(
        r#"<a href="{}" class="{}">All ({})</a>"#,
        ViewState::default().href(),
        if view.status_filter.is_none() { "active" } else { "" },
        all_count
    );
    for status in ProjectStatus::ALL {
        filters.push_str(&format!(
            r#"<a href="{}" class="{}">{} ({})</a>"#,
            ViewState::default().with_status_filter(Some(status)).href(),
            if view.status_filter == Some(status) { "active" } else { "" },
            status.label(),
            count_of(status)
        ));
    }

    let list = if projects.is_empty() {
        r#"<div class="empty-state">No projects</div>"#.to_string()
    } else {
        projects
            .iter()
            .map(|project| {
                let metrics = project_metrics(&tracker.list_tasks(project.id, None));
                format!(
                    r#"<a href="{}" class="{}">{}<br><small class="muted">{} · {}%</small></a>"#,
                    ViewState::for_project(project.id)
                        .with_status_filter(view.status_filter)
                        .href(),
                    if view.project == Some(project.id) { "active" } else { "" },
                    html_escape(&truncate_text(&project.name, 40)),
                    project.status.label(),
                    metrics.progress_rate
                )
            })
            .collect()
    };

    format!(
        r#"<div>👋 <strong>{username}</strong></div>
<form method="post" action="/logout"><button type="submit">Log out</button></form>
<h3>Projects</h3>
<p><a href="{new_href}">➕ New project</a></p>
<div class="filters">{filters}</div>
<div class="project-list">{list}</div>"#,
        username = html_escape(&user.username),
        new_href = ViewState::default()
            .with_status_filter(view.status_filter)
            .with_new_project()
            .href(),
        filters = filters,
        list = list,
    )
}

fn home_html(
    tracker: &Tracker,
    user: &User,
    projects: &[Project],
    view: &ViewState,
    errors: &[String],
) -> String {
    let mut html = format!("<h1>Projects</h1>{}", messages_html(errors));

    if projects.is_empty() {
        html.push_str(&format!(
            r#"<div class="empty-state">No projects yet. <a href="{}">Create your first project</a>.</div>"#,
            ViewState::default().with_new_project().href()
        ));
    } else {
        html.push_str(
            "<table><thead><tr><th>Project</th><th>Status</th><th>Period</th><th>Progress</th></tr></thead><tbody>",
        );
        for project in projects {
            let metrics = project_metrics(&tracker.list_tasks(project.id, None));
            html.push_str(&format!(
                r#"<tr><td><a href="{}">{}</a></td><td>{}</td><td>{}</td><td>{} / {} ({}%)</td></tr>"#,
                ViewState::for_project(project.id)
                    .with_status_filter(view.status_filter)
                    .href(),
                html_escape(&project.name),
                project.status.label(),
                date_range_text(project.start_date, project.target_end_date),
                metrics.done,
                metrics.total,
                metrics.progress_rate
            ));
        }
        html.push_str("</tbody></table>");
    }

    let retrospectives = tracker.list_retrospectives(Some(user.id));
    if !retrospectives.is_empty() {
        let now = now_ms();
        html.push_str("<h2>💭 Recent retrospectives</h2>");
        for summary in retrospectives.iter().take(5) {
            let retro = &summary.retrospective;
            html.push_str(&format!(
                r#"<div class="card"><a href="{}"><strong>{}</strong></a> <span class="muted">{}</span><br>{}</div>"#,
                ViewState::for_project(retro.project_id)
                    .with_tab(Tab::Retrospective)
                    .href(),
                html_escape(&summary.project_name),
                relative_time(retro.updated_at, now),
                html_escape(&truncate_text(
                    retro.keep_content.as_deref().unwrap_or("-"),
                    80
                ))
            ));
        }
    }
    html
}

// ----------------------------------------------------------------------
// Project
// ----------------------------------------------------------------------

fn status_options(selected: ProjectStatus) -> String {
    ProjectStatus::ALL
        .iter()
        .map(|status| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                status.as_str(),
                if *status == selected { " selected" } else { "" },
                status.label()
            )
        })
        .collect()
}

/// Create form when `project` is `None`, edit form otherwise.
fn project_form_html(project: Option<&Project>, view: &ViewState, errors: &[String]) -> String {
    let (heading, action, cancel) = match project {
        Some(p) => (
            "✏️ Edit project",
            format!("/projects/{}", p.id),
            ViewState::for_project(p.id)
                .with_status_filter(view.status_filter)
                .href(),
        ),
        None => (
            "➕ New project",
            "/projects".to_string(),
            ViewState::default()
                .with_status_filter(view.status_filter)
                .href(),
        ),
    };
    let start_date = match project {
        Some(p) => date_input_value(p.start_date),
        None => format_date(today()),
    };

    format!(
        r#"<h1>{heading}</h1>
{errors}
<form class="stacked card" method="post" action="{action}">
    <label for="name">Name *</label>
    <input type="text" id="name" name="name" maxlength="200" value="{name}" required>
    <label for="description">Description</label>
    <textarea id="description" name="description">{description}</textarea>
    <label for="github_url">GitHub URL</label>
    <input type="text" id="github_url" name="github_url" value="{github_url}">
    <div class="grid grid-2">
        <div><label for="start_date">Start date</label>
        <input type="date" id="start_date" name="start_date" value="{start_date}"></div>
        <div><label for="target_end_date">Target end date</label>
        <input type="date" id="target_end_date" name="target_end_date" value="{target_end_date}"></div>
    </div>
    <label for="status">Status</label>
    <select id="status" name="status">{status_options}</select>
    <p class="actions"><button class="primary" type="submit">Save</button> <a href="{cancel}">Cancel</a></p>
</form>"#,
        heading = heading,
        errors = messages_html(errors),
        action = action,
        name = html_escape(project.map(|p| p.name.as_str()).unwrap_or_default()),
        description = html_escape(project.and_then(|p| p.description.as_deref()).unwrap_or_default()),
        github_url = html_escape(project.and_then(|p| p.github_url.as_deref()).unwrap_or_default()),
        start_date = start_date,
        target_end_date = date_input_value(project.and_then(|p| p.target_end_date)),
        status_options = status_options(project.map(|p| p.status).unwrap_or_default()),
        cancel = cancel,
    )
}

fn project_html(tracker: &Tracker, project: &Project, view: &ViewState, errors: &[String]) -> String {
    if view.mode == Mode::Edit && view.task.is_none() {
        return project_form_html(Some(project), view, errors);
    }

    let base = ViewState::for_project(project.id).with_status_filter(view.status_filter);

    let mut header = format!(
        r#"<h1>{}</h1><p><span class="badge">{}</span> <span class="muted">{}</span>"#,
        html_escape(&project.name),
        project.status.label(),
        date_range_text(project.start_date, project.target_end_date),
    );
    if let Some(end) = project.target_end_date
        && project.status != ProjectStatus::Completed
    {
        let (text, state) = due_date_badge(end);
        header.push_str(&format!(r#" <span class="{}">{}</span>"#, state.css_class(), text));
    }
    if let Some(ref url) = project.github_url
        && is_web_url(url)
    {
        header.push_str(&format!(
            r#" · <a href="{}" target="_blank" rel="noopener">🔗 {}</a>"#,
            html_escape(url),
            html_escape(github_repo_name(url))
        ));
    }
    header.push_str(&format!(
        r#" · <a href="{}">Edit</a> · <a href="{}">Delete</a></p>"#,
        base.clone().with_mode(Mode::Edit).href(),
        base.clone().with_mode(Mode::Delete).href(),
    ));
    if let Some(ref description) = project.description {
        header.push_str(&format!(
            r#"<p class="muted">{}</p>"#,
            html_escape(description)
        ));
    }

    if view.mode == Mode::Delete && view.task.is_none() {
        header.push_str(&format!(
            r#"<div class="message message-error">⚠️ Delete this project with all of its tasks, milestones and retrospective?
<form method="post" action="/projects/{}/delete" class="actions"><button class="danger" type="submit">Delete</button> <a href="{}">Cancel</a></form></div>"#,
            project.id,
            base.href()
        ));
    }

    let tabs: String = Tab::ALL
        .iter()
        .map(|tab| {
            format!(
                r#"<a href="{}" class="{}">{}</a>"#,
                base.clone().with_tab(*tab).href(),
                if *tab == view.tab { "active" } else { "" },
                tab.label()
            )
        })
        .collect();

    let content = match view.tab {
        Tab::Dashboard => dashboard_tab_html(tracker, project, errors),
        Tab::Board => board_tab_html(tracker, project, view, errors),
        Tab::Retrospective => {
            retrospective_tab_html(project, tracker.get_retrospective(project.id).as_ref(), errors)
        }
    };

    format!(r#"{}<nav class="tabs">{}</nav>{}"#, header, tabs, content)
}

// ----------------------------------------------------------------------
// Dashboard tab
// ----------------------------------------------------------------------

fn dashboard_tab_html(tracker: &Tracker, project: &Project, errors: &[String]) -> String {
    let tasks = tracker.list_tasks(project.id, None);
    let metrics = project_metrics(&tasks);

    let stat = |value: String, label: &str| {
        format!(
            r#"<div class="card stat"><div class="stat-value">{}</div><div class="stat-label">{}</div></div>"#,
            value, label
        )
    };
    let mut html = format!(
        r#"<div class="grid grid-stats">{}{}{}{}{}</div>
<div class="bar"><span style="width:{:.1}%"></span></div>"#,
        stat(metrics.total.to_string(), "Total tasks"),
        stat(metrics.todo.to_string(), "To Do"),
        stat(metrics.in_progress.to_string(), "In Progress"),
        stat(metrics.done.to_string(), "Done"),
        stat(format!("{}%", metrics.progress_rate), "Progress"),
        metrics.progress_rate
    );

    if tasks.is_empty() {
        html.push_str(r#"<div class="empty-state">No tasks yet. Add some on the board.</div>"#);
    } else {
        let status = status_distribution(&tasks);
        let status_bars: String = TaskStatus::ALL
            .iter()
            .map(|s| {
                bar_row(
                    &format!("{} {}", status_icon(*s), status_label(*s)),
                    status.get(*s),
                    status.total(),
                    &format!("bar-{}", s.as_str()),
                )
            })
            .collect();

        let priority = priority_distribution(&tasks);
        let priority_bars: String = Priority::ALL
            .iter()
            .map(|p| bar_row(priority_badge(*p), priority.get(*p), tasks.len(), ""))
            .collect();

        html.push_str(&format!(
            r#"<div class="grid grid-2"><div class="card"><h3>Status</h3>{}</div><div class="card"><h3>Priority</h3>{}</div></div>"#,
            status_bars, priority_bars
        ));

        html.push_str(&tags_html(&tag_distribution(&tasks), tasks.len()));
        html.push_str(&history_html(&tasks));
    }

    html.push_str(&milestones_html(
        project,
        &tracker.list_milestones(project.id),
        errors,
    ));
    html
}

fn tags_html(tags: &[TagCount], task_count: usize) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let bars: String = tags
        .iter()
        .map(|t| {
            let icon = tag_icons(&t.tag);
            let label = if icon == t.tag {
                html_escape(&t.tag)
            } else {
                format!("{} {}", icon, html_escape(&t.tag))
            };
            bar_row(&label, t.count, task_count, "")
        })
        .collect();
    format!(r#"<div class="card"><h3>Tags</h3>{}</div>"#, bars)
}

fn history_html(tasks: &[Task]) -> String {
    let history = progress_history(tasks);
    if history.is_empty() {
        return String::new();
    }
    let rows: String = history
        .iter()
        .map(|point| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td>{}</td><td><div class="bar bar-done"><span style="width:{:.1}%"></span></div></td><td>{}%</td></tr>"#,
                format_date(point.date),
                point.count,
                point.cumulative,
                point.progress_rate,
                point.progress_rate
            )
        })
        .collect();
    format!(
        r#"<div class="card"><h3>📈 Progress</h3><table><thead><tr><th>Date</th><th>Completed</th><th>Cumulative</th><th></th><th>Rate</th></tr></thead><tbody>{}</tbody></table></div>"#,
        rows
    )
}

fn milestones_html(project: &Project, milestones: &[Milestone], errors: &[String]) -> String {
    let mut html = String::from("<h2>🎯 Milestones</h2>");
    if milestones.is_empty() {
        html.push_str(r#"<div class="empty-state">No milestones</div>"#);
    }
    for milestone in milestones {
        let badge = match milestone.target_date {
            Some(date) if !milestone.is_completed => {
                let (text, state) = due_date_badge(date);
                format!(
                    r#"{} <span class="{}">{}</span>"#,
                    format_date(date),
                    state.css_class(),
                    text
                )
            }
            Some(date) => format_date(date),
            None => String::new(),
        };
        let completed = milestone
            .completed_at
            .map(|ms| format!(" · completed {}", format_datetime(ms)))
            .unwrap_or_default();
        html.push_str(&format!(
            r#"<div class="card"><strong class="{title_class}">{check} {title}</strong> <span class="muted">{badge}{completed}</span>
<div class="muted">{description}</div>
<div class="actions">
<form method="post" action="/milestones/{id}/toggle"><input type="hidden" name="completed" value="{next}"><button type="submit">{toggle_label}</button></form>
<form method="post" action="/milestones/{id}/delete"><button class="danger" type="submit">Delete</button></form>
</div></div>"#,
            title_class = if milestone.is_completed { "checked" } else { "" },
            check = if milestone.is_completed { "✅" } else { "⬜" },
            title = html_escape(&milestone.title),
            badge = badge,
            completed = completed,
            description = html_escape(milestone.description.as_deref().unwrap_or_default()),
            id = milestone.id,
            next = !milestone.is_completed,
            toggle_label = if milestone.is_completed { "Reopen" } else { "Complete" },
        ));
    }

    html.push_str(&format!(
        r#"{errors}<form class="stacked card" method="post" action="/projects/{id}/milestones">
    <h3>Add milestone</h3>
    <div class="grid grid-2">
        <div><label for="milestone_title">Title *</label><input type="text" id="milestone_title" name="title"></div>
        <div><label for="milestone_date">Target date *</label><input type="date" id="milestone_date" name="target_date"></div>
    </div>
    <label for="milestone_description">Description</label>
    <input type="text" id="milestone_description" name="description">
    <p><button type="submit">Add</button></p>
</form>"#,
        errors = messages_html(errors),
        id = project.id,
    ));
    html
}

// ----------------------------------------------------------------------
// Board tab
// ----------------------------------------------------------------------

fn task_status_options(selected: TaskStatus) -> String {
    TaskStatus::ALL
        .iter()
        .map(|status| {
            format!(
                r#"<option value="{}"{}>{} {}</option>"#,
                status.as_str(),
                if *status == selected { " selected" } else { "" },
                status_icon(*status),
                status_label(*status)
            )
        })
        .collect()
}

fn priority_options(selected: Priority) -> String {
    Priority::ALL
        .iter()
        .map(|priority| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                priority.as_str(),
                if *priority == selected { " selected" } else { "" },
                priority_badge(*priority)
            )
        })
        .collect()
}

/// Label of the card button moving a task to its next status.
fn advance_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "▶ Start",
        TaskStatus::InProgress => "✅ Complete",
        TaskStatus::Done => "↩ Reopen",
    }
}

fn board_tab_html(tracker: &Tracker, project: &Project, view: &ViewState, errors: &[String]) -> String {
    let base = ViewState::for_project(project.id)
        .with_status_filter(view.status_filter)
        .with_tab(Tab::Board);
    let tasks = tracker.list_tasks(project.id, None);

    let mut html = String::new();

    let open_task = view
        .task
        .and_then(|id| tracker.get_task(id))
        .filter(|task| task.project_id == project.id);
    match open_task {
        Some(ref task) => html.push_str(&task_panel_html(tracker, task, &base, view.mode, errors)),
        None => html.push_str(&messages_html(errors)),
    }

    html.push_str(&format!(
        r#"<form class="inline-form card" method="post" action="/projects/{id}/tasks">
    <input type="hidden" name="quick" value="1">
    <input type="text" name="title" placeholder="Quick add a task..." maxlength="200">
    <button class="primary" type="submit">Add</button>
</form>
<details class="card"><summary>Add task with details</summary>
<form class="stacked" method="post" action="/projects/{id}/tasks">
    {fields}
    <p><button class="primary" type="submit">Create task</button></p>
</form></details>"#,
        id = project.id,
        fields = task_fields_html(None),
    ));

    let columns: String = TaskStatus::ALL
        .iter()
        .map(|status| {
            let column_tasks: Vec<&Task> = tasks.iter().filter(|t| t.status == *status).collect();
            let cards: String = if column_tasks.is_empty() {
                r#"<div class="empty-state">Empty</div>"#.to_string()
            } else {
                column_tasks
                    .iter()
                    .map(|task| task_card_html(tracker, task, &base))
                    .collect()
            };
            format!(
                r#"<div class="column"><h3>{} {} ({})</h3>{}</div>"#,
                status_icon(*status),
                status_label(*status),
                column_tasks.len(),
                cards
            )
        })
        .collect();
    html.push_str(&format!(r#"<div class="board">{}</div>"#, columns));
    html
}

/// Inputs shared by the create and edit task forms.
fn task_fields_html(task: Option<&Task>) -> String {
    format!(
        r#"<label>Title *</label>
    <input type="text" name="title" maxlength="200" value="{title}" required>
    <label>Description</label>
    <textarea name="description">{description}</textarea>
    <div class="grid grid-2">
        <div><label>Status</label><select name="status">{status}</select></div>
        <div><label>Priority</label><select name="priority">{priority}</select></div>
        <div><label>Tags (comma separated)</label><input type="text" name="tags" value="{tags}" placeholder="Dev, Design"></div>
        <div><label>Estimated hours</label><input type="number" name="estimated_hours" min="0" step="0.5" value="{hours}"></div>
        <div><label>Due date</label><input type="date" name="due_date" value="{due}"></div>
    </div>"#,
        title = html_escape(task.map(|t| t.title.as_str()).unwrap_or_default()),
        description = html_escape(task.and_then(|t| t.description.as_deref()).unwrap_or_default()),
        status = task_status_options(task.map(|t| t.status).unwrap_or_default()),
        priority = priority_options(task.map(|t| t.priority).unwrap_or_default()),
        tags = html_escape(task.and_then(|t| t.tags.as_deref()).unwrap_or_default()),
        hours = task
            .and_then(|t| t.estimated_hours)
            .map(|h| h.to_string())
            .unwrap_or_default(),
        due = date_input_value(task.and_then(|t| t.due_date)),
    )
}

fn task_card_html(tracker: &Tracker, task: &Task, base: &ViewState) -> String {
    let mut meta = vec![priority_badge(task.priority).to_string()];
    let icons = tag_icons(task.tags.as_deref().unwrap_or_default());
    if !icons.is_empty() {
        meta.push(html_escape(&icons));
    }
    if let Some(due) = task.due_date
        && task.status != TaskStatus::Done
    {
        let (text, state) = due_date_badge(due);
        meta.push(format!(r#"<span class="{}">{}</span>"#, state.css_class(), text));
    }
    if task.estimated_hours.is_some() {
        meta.push(format!("⏱ {}", format_hours(task.estimated_hours)));
    }
    let checklist = tracker.list_checklist_items(task.id);
    if !checklist.is_empty() {
        let checked = checklist.iter().filter(|i| i.is_checked).count();
        meta.push(format!("☑ {}/{}", checked, checklist.len()));
    }

    format!(
        r#"<div class="card task-card">
<div class="title"><a href="{open}">{title}</a></div>
<div class="meta">{meta}</div>
<div class="actions">
<form method="post" action="/tasks/{id}/status"><input type="hidden" name="status" value="{next}"><button type="submit">{advance}</button></form>
<a href="{edit}">Edit</a>
<form method="post" action="/tasks/{id}/delete"><button class="danger" type="submit">Delete</button></form>
</div></div>"#,
        open = base.clone().with_task(task.id, Mode::View).href(),
        edit = base.clone().with_task(task.id, Mode::Edit).href(),
        title = html_escape(&truncate_text(&task.title, 60)),
        meta = meta.join(" "),
        id = task.id,
        next = task.status.next().as_str(),
        advance = advance_label(task.status),
    )
}

fn checklist_html(items: &[ChecklistItem]) -> String {
    if items.is_empty() {
        return r#"<p class="muted">No checklist items</p>"#.to_string();
    }
    let rows: String = items
        .iter()
        .map(|item| {
            format!(
                r#"<li><form method="post" action="/checklist/{id}/toggle"><input type="hidden" name="checked" value="{next}"><button type="submit">{box_}</button></form>
<span class="{class}">{content}</span>
<form method="post" action="/checklist/{id}/delete"><button class="danger" type="submit">✕</button></form></li>"#,
                id = item.id,
                next = !item.is_checked,
                box_ = if item.is_checked { "☑" } else { "☐" },
                class = if item.is_checked { "checked" } else { "" },
                content = html_escape(&item.content),
            )
        })
        .collect();
    format!(r#"<ul class="checklist">{}</ul>"#, rows)
}

fn task_panel_html(
    tracker: &Tracker,
    task: &Task,
    base: &ViewState,
    mode: Mode,
    errors: &[String],
) -> String {
    let close = base.clone().without_task().href();
    let checklist = tracker.list_checklist_items(task.id);

    if mode == Mode::Edit {
        return format!(
            r#"<div class="card"><h2>✏️ Edit task</h2>{errors}
<form class="stacked" method="post" action="/tasks/{id}">
    {fields}
    <label>Add checklist items (one per line)</label>
    <textarea name="checklist"></textarea>
    <p class="actions"><button class="primary" type="submit">Save</button> <a href="{view}">Cancel</a></p>
</form>
<h3>Checklist</h3>{checklist}</div>"#,
            errors = messages_html(errors),
            id = task.id,
            fields = task_fields_html(Some(task)),
            view = base.clone().with_task(task.id, Mode::View).href(),
            checklist = checklist_html(&checklist),
        );
    }

    let now = now_ms();
    let stamp = |label: &str, ms: Option<i64>| {
        ms.map(|ms| {
            format!(
                "<tr><th>{}</th><td>{} <span class=\"muted\">({})</span></td></tr>",
                label,
                format_datetime(ms),
                relative_time(ms, now)
            )
        })
        .unwrap_or_default()
    };
    let due = task
        .due_date
        .map(|d| {
            let (text, state) = due_date_badge(d);
            format!(
                r#"<tr><th>Due</th><td>{} <span class="{}">{}</span></td></tr>"#,
                format_date(d),
                state.css_class(),
                text
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div class="card"><h2>{icon} {title}</h2>{errors}
<p><span class="badge">{status}</span> {priority} {tags}</p>
<p>{description}</p>
<table>
<tr><th>Estimate</th><td>{hours}</td></tr>
{due}{created}{started}{completed}
</table>
<h3>Checklist</h3>{checklist}
<p class="actions"><a href="{edit}">Edit</a> <a href="{close}">Close</a></p></div>"#,
        icon = status_icon(task.status),
        title = html_escape(&task.title),
        errors = messages_html(errors),
        status = status_label(task.status),
        priority = priority_badge(task.priority),
        tags = html_escape(task.tags.as_deref().unwrap_or_default()),
        description = html_escape(task.description.as_deref().unwrap_or_default()),
        hours = format_hours(task.estimated_hours),
        due = due,
        created = stamp("Created", Some(task.created_at)),
        started = stamp("Started", task.started_at),
        completed = stamp("Completed", task.completed_at),
        checklist = checklist_html(&checklist),
        edit = base.clone().with_task(task.id, Mode::Edit).href(),
        close = close,
    )
}

// ----------------------------------------------------------------------
// Retrospective tab
// ----------------------------------------------------------------------

fn retrospective_tab_html(
    project: &Project,
    retrospective: Option<&Retrospective>,
    errors: &[String],
) -> String {
    let text = |value: Option<&String>| html_escape(value.map(String::as_str).unwrap_or_default());
    let updated = retrospective
        .map(|r| {
            format!(
                r#"<p class="muted">Last updated {}</p>"#,
                relative_time(r.updated_at, now_ms())
            )
        })
        .unwrap_or_default();

    format!(
        r#"<h2>💭 KPT retrospective</h2>{updated}{errors}
<form class="stacked" method="post" action="/projects/{id}/retrospective">
<div class="grid grid-2">
    <div class="card"><label for="keep_content">👍 Keep: what went well</label>
    <textarea id="keep_content" name="keep_content">{keep}</textarea></div>
    <div class="card"><label for="problem_content">🤔 Problem: what got in the way</label>
    <textarea id="problem_content" name="problem_content">{problem}</textarea></div>
    <div class="card"><label for="try_content">💡 Try: what to do next time</label>
    <textarea id="try_content" name="try_content">{try_}</textarea></div>
    <div class="card"><label for="learning_content">📚 Learning</label>
    <textarea id="learning_content" name="learning_content">{learning}</textarea></div>
</div>
<p><button class="primary" type="submit">Save retrospective</button></p>
</form>"#,
        updated = updated,
        errors = messages_html(errors),
        id = project.id,
        keep = text(retrospective.and_then(|r| r.keep_content.as_ref())),
        problem = text(retrospective.and_then(|r| r.problem_content.as_ref())),
        try_ = text(retrospective.and_then(|r| r.try_content.as_ref())),
        learning = text(retrospective.and_then(|r| r.learning_content.as_ref())),
    )
}
