//! Integration tests for the web dashboard, driving the router directly
//! without binding a socket.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use project_tracker::config::AuthConfig;
use project_tracker::dashboard::session::login_cookies;
use project_tracker::dashboard::{DashboardServer, build_router};
use project_tracker::db::Database;
use project_tracker::tracker::Tracker;
use project_tracker::types::{NewProject, NewTask, SignupInput, TaskStatus, User};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

/// Helper to build the router over a fresh in-memory database.
fn setup_app() -> (Router, Tracker) {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    let tracker = Tracker::new(Arc::new(db));
    let auth = AuthConfig {
        remember_secret: SECRET.to_string(),
        remember_days: 30,
        min_password_len: 6,
    };
    let app = build_router(DashboardServer::new(tracker.clone(), auth));
    (app, tracker)
}

fn signup(tracker: &Tracker, email: &str) -> User {
    let id = tracker
        .signup(SignupInput {
            username: "Ada".into(),
            email: email.into(),
            password: "secret1".into(),
            password_confirm: "secret1".into(),
        })
        .id()
        .expect("signup should succeed");
    tracker.get_user(id).unwrap()
}

/// `Cookie` header value a browser would send after `user` logged in.
fn cookie_header(user: &User) -> String {
    login_cookies(user, SECRET, None)
        .iter()
        .filter_map(|(_, value)| value.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

mod auth_flow_tests {
    use super::*;

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = setup_app();
        let response = app.oneshot(get("/api/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("healthy"));
    }

    #[tokio::test]
    async fn main_page_redirects_to_login() {
        let (app, _) = setup_app();
        let response = app.oneshot(get("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn signup_then_login_sets_cookies() {
        let (app, _) = setup_app();

        let response = app
            .clone()
            .oneshot(post_form(
                "/signup",
                "username=Ada&email=a%40example.com&password=secret1&password_confirm=secret1",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?registered=1");

        let response = app
            .oneshot(post_form(
                "/login",
                "email=a%40example.com&password=secret1&remember=on",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let cookies: Vec<&str> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 3);
        assert!(cookies.iter().any(|c| c.starts_with("pt_uid=")));
        assert!(cookies.iter().all(|c| c.contains("Max-Age=2592000")));
    }

    #[tokio::test]
    async fn signup_errors_are_shown() {
        let (app, _) = setup_app();
        let response = app
            .oneshot(post_form(
                "/signup",
                "username=Ada&email=a%40example.com&password=secret1&password_confirm=other1",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("Passwords do not match"));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (app, tracker) = setup_app();
        signup(&tracker, "a@example.com");

        let response = app
            .oneshot(post_form("/login", "email=a%40example.com&password=nope", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(response).await.contains("Invalid email or password"));
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let (app, tracker) = setup_app();
        let user = signup(&tracker, "a@example.com");
        let cookie = format!("pt_uid={}; pt_email=a%40example.com; pt_token=forged", user.id);

        let response = app.oneshot(get("/", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn logout_expires_cookies() {
        let (app, _) = setup_app();
        let response = app.oneshot(post_form("/logout", "", None)).await.unwrap();
        assert_eq!(location(&response), "/login");
        assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 3);
    }
}

mod page_tests {
    use super::*;

    #[tokio::test]
    async fn logged_in_user_sees_main_page() {
        let (app, tracker) = setup_app();
        let user = signup(&tracker, "a@example.com");

        let response = app
            .oneshot(get("/", Some(&cookie_header(&user))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Ada"));
        assert!(body.contains("Create your first project"));
    }

    #[tokio::test]
    async fn create_project_redirects_to_it() {
        let (app, tracker) = setup_app();
        let user = signup(&tracker, "a@example.com");

        let response = app
            .oneshot(post_form(
                "/projects",
                "name=Demo&start_date=2024-01-01&target_end_date=2024-03-31&status=active",
                Some(&cookie_header(&user)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let projects = tracker.list_projects(Default::default());
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].user_id, Some(user.id));
        assert_eq!(location(&response), format!("/?project={}", projects[0].id));
    }

    #[tokio::test]
    async fn invalid_project_is_rerendered_with_errors() {
        let (app, tracker) = setup_app();
        let user = signup(&tracker, "a@example.com");

        let response = app
            .oneshot(post_form(
                "/projects",
                "name=&start_date=2024-02-01&target_end_date=2024-01-01",
                Some(&cookie_header(&user)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_text(response).await;
        assert!(body.contains("Project name is required"));
        assert!(body.contains("Start date must not be after the target end date"));
        assert!(tracker.list_projects(Default::default()).is_empty());
    }

    #[tokio::test]
    async fn advance_button_moves_task_forward() {
        let (app, tracker) = setup_app();
        let user = signup(&tracker, "a@example.com");
        let project = tracker
            .create_project(Some(user.id), NewProject { name: "Demo".into(), ..Default::default() })
            .id()
            .unwrap();
        let task = tracker
            .create_task(project, NewTask::titled("Write spec"))
            .id()
            .unwrap();

        let response = app
            .oneshot(post_form(
                &format!("/tasks/{}/status", task),
                "status=next",
                Some(&cookie_header(&user)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            format!("/?project={}&tab=board", project)
        );
        assert_eq!(tracker.get_task(task).unwrap().status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn edit_form_appends_checklist_items() {
        let (app, tracker) = setup_app();
        let user = signup(&tracker, "a@example.com");
        let project = tracker
            .create_project(Some(user.id), NewProject { name: "Demo".into(), ..Default::default() })
            .id()
            .unwrap();
        let task = tracker.quick_add_task(project, "Write spec").id().unwrap();

        let response = app
            .oneshot(post_form(
                &format!("/tasks/{}", task),
                "title=Write+spec&status=todo&priority=high&tags=Docs&checklist=outline%0A%0Adraft",
                Some(&cookie_header(&user)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(tracker.list_checklist_items(task).len(), 2);
        assert_eq!(tracker.get_task(task).unwrap().tags.as_deref(), Some("Docs"));
    }

    #[tokio::test]
    async fn other_users_project_cannot_be_deleted() {
        let (app, tracker) = setup_app();
        let owner = signup(&tracker, "a@example.com");
        let intruder = signup(&tracker, "b@example.com");
        let project = tracker
            .create_project(Some(owner.id), NewProject { name: "Demo".into(), ..Default::default() })
            .id()
            .unwrap();

        let response = app
            .oneshot(post_form(
                &format!("/projects/{}/delete", project),
                "",
                Some(&cookie_header(&intruder)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(tracker.get_project(project).is_some());
    }
}

mod api_tests {
    use super::*;

    #[tokio::test]
    async fn metrics_require_login() {
        let (app, _) = setup_app();
        let response = app
            .oneshot(get("/api/projects/1/metrics", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("NOT_AUTHENTICATED"));
    }

    #[tokio::test]
    async fn metrics_for_own_project() {
        let (app, tracker) = setup_app();
        let user = signup(&tracker, "a@example.com");
        let project = tracker
            .create_project(Some(user.id), NewProject { name: "Demo".into(), ..Default::default() })
            .id()
            .unwrap();
        let task = tracker
            .create_task(
                project,
                NewTask {
                    tags: Some("Dev".into()),
                    ..NewTask::titled("Write spec")
                },
            )
            .id()
            .unwrap();
        tracker.transition_task(task, TaskStatus::Done);

        let response = app
            .oneshot(get(
                &format!("/api/projects/{}/metrics", project),
                Some(&cookie_header(&user)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["metrics"]["total"], 1);
        assert_eq!(json["metrics"]["done"], 1);
        assert_eq!(json["metrics"]["progress_rate"], 100.0);
        assert_eq!(json["tags"][0]["tag"], "Dev");
        assert_eq!(json["history"][0]["cumulative"], 1);
    }

    #[tokio::test]
    async fn metrics_store_failure_is_a_database_error() {
        let (app, tracker) = setup_app();
        let user = signup(&tracker, "a@example.com");
        let project = tracker
            .create_project(Some(user.id), NewProject { name: "Demo".into(), ..Default::default() })
            .id()
            .unwrap();
        tracker
            .db()
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE checklist_items; DROP TABLE tasks;")?;
                Ok(())
            })
            .unwrap();

        let response = app
            .oneshot(get(
                &format!("/api/projects/{}/metrics", project),
                Some(&cookie_header(&user)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("DATABASE_ERROR"));
    }

    #[tokio::test]
    async fn metrics_for_missing_project_is_not_found() {
        let (app, tracker) = setup_app();
        let user = signup(&tracker, "a@example.com");
        let response = app
            .oneshot(get("/api/projects/99/metrics", Some(&cookie_header(&user))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
