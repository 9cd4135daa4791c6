//! Integration tests for domain operations: validation, lifecycle rules,
//! authentication and metrics over real stored data.

use chrono::NaiveDate;
use project_tracker::db::Database;
use project_tracker::format::today;
use project_tracker::metrics::{project_metrics, tag_distribution};
use project_tracker::tracker::{CreateOutcome, Tracker};
use project_tracker::types::{
    NewMilestone, NewProject, NewTask, ProjectFilter, ProjectStatus, ProjectUpdate,
    RetrospectiveInput, SignupInput, TaskStatus, TaskUpdate,
};
use std::sync::Arc;

/// Helper to create a tracker over a fresh in-memory database.
fn setup_tracker() -> Tracker {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    Tracker::new(Arc::new(db))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn create_project(tracker: &Tracker, name: &str) -> i64 {
    tracker
        .create_project(
            None,
            NewProject {
                name: name.to_string(),
                ..Default::default()
            },
        )
        .id()
        .expect("project should be created")
}

fn signup_input(email: &str) -> SignupInput {
    SignupInput {
        username: "Ada".into(),
        email: email.into(),
        password: "secret1".into(),
        password_confirm: "secret1".into(),
    }
}

mod end_to_end_tests {
    use super::*;

    #[test]
    fn demo_project_reaches_full_progress() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        let task_id = tracker
            .create_task(project_id, NewTask::titled("Write spec"))
            .id()
            .unwrap();

        assert!(tracker.transition_task(task_id, TaskStatus::InProgress));
        assert!(tracker.transition_task(task_id, TaskStatus::Done));

        let metrics = project_metrics(&tracker.list_tasks(project_id, None));
        assert_eq!(metrics.total, 1);
        assert_eq!(metrics.todo, 0);
        assert_eq!(metrics.in_progress, 0);
        assert_eq!(metrics.done, 1);
        assert_eq!(metrics.progress_rate, 100.0);

        let overview = tracker.project_overview(project_id).unwrap();
        assert_eq!(overview.project.name, "Demo");
        assert_eq!(overview.metrics, metrics);
    }
}

mod project_tests {
    use super::*;

    #[test]
    fn start_date_defaults_to_today_and_name_is_trimmed() {
        let tracker = setup_tracker();
        let id = create_project(&tracker, "  Demo  ");
        let project = tracker.get_project(id).unwrap();
        assert_eq!(project.name, "Demo");
        assert_eq!(project.start_date, Some(today()));
    }

    #[test]
    fn inverted_dates_are_rejected_without_writing() {
        let tracker = setup_tracker();
        let outcome = tracker.create_project(
            None,
            NewProject {
                name: "Demo".into(),
                start_date: Some(date(2024, 2, 1)),
                target_end_date: Some(date(2024, 1, 1)),
                ..Default::default()
            },
        );
        assert_eq!(
            outcome,
            CreateOutcome::Invalid(vec![
                "Start date must not be after the target end date".to_string()
            ])
        );
        assert!(tracker.list_projects(ProjectFilter::default()).is_empty());
    }

    #[test]
    fn non_web_github_urls_are_rejected() {
        let tracker = setup_tracker();
        let outcome = tracker.create_project(
            None,
            NewProject {
                name: "Demo".into(),
                github_url: Some("javascript:alert(1)".into()),
                ..Default::default()
            },
        );
        assert_eq!(
            outcome,
            CreateOutcome::Invalid(vec![
                "GitHub URL must start with http:// or https://".to_string()
            ])
        );

        let id = create_project(&tracker, "Demo");
        let update = ProjectUpdate {
            github_url: Some(Some("javascript:alert(1)".into())),
            ..Default::default()
        };
        assert!(tracker.update_project(id, update).is_err());
        assert!(tracker.get_project(id).unwrap().github_url.is_none());
    }

    #[test]
    fn blank_name_is_rejected() {
        let tracker = setup_tracker();
        let outcome = tracker.create_project(None, NewProject::default());
        assert!(matches!(outcome, CreateOutcome::Invalid(ref e) if e.len() == 1));
    }

    #[test]
    fn update_validates_against_stored_dates() {
        let tracker = setup_tracker();
        let id = tracker
            .create_project(
                None,
                NewProject {
                    name: "Demo".into(),
                    start_date: Some(date(2024, 3, 1)),
                    ..Default::default()
                },
            )
            .id()
            .unwrap();

        let update = ProjectUpdate {
            target_end_date: Some(Some(date(2024, 2, 1))),
            ..Default::default()
        };
        assert!(tracker.update_project(id, update).is_err());

        let update = ProjectUpdate {
            target_end_date: Some(Some(date(2024, 4, 1))),
            status: Some(ProjectStatus::OnHold),
            ..Default::default()
        };
        assert_eq!(tracker.update_project(id, update), Ok(true));
        assert_eq!(tracker.get_project(id).unwrap().status, ProjectStatus::OnHold);
    }

    #[test]
    fn update_of_missing_project_is_false() {
        let tracker = setup_tracker();
        let update = ProjectUpdate {
            name: Some("Ghost".into()),
            ..Default::default()
        };
        assert_eq!(tracker.update_project(42, update), Ok(false));
        assert!(!tracker.delete_project(42));
    }

    #[test]
    fn ownership_is_checked() {
        let tracker = setup_tracker();
        let ada = tracker.signup(signup_input("a@example.com")).id().unwrap();
        let bob = tracker.signup(signup_input("b@example.com")).id().unwrap();
        let id = tracker
            .create_project(Some(ada), NewProject { name: "Mine".into(), ..Default::default() })
            .id()
            .unwrap();

        assert!(tracker.project_for_user(id, ada).is_some());
        assert!(tracker.project_for_user(id, bob).is_none());
        assert_eq!(tracker.project_status_counts(ada), vec![(ProjectStatus::Active, 1)]);
    }
}

mod task_tests {
    use super::*;

    #[test]
    fn first_start_stamps_started_at_only() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        let id = tracker.quick_add_task(project_id, "Write spec").id().unwrap();

        tracker.transition_task(id, TaskStatus::InProgress);
        let task = tracker.get_task(id).unwrap();
        assert!(task.started_at.is_some());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn repeated_done_keeps_completion_time() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        let id = tracker.quick_add_task(project_id, "Write spec").id().unwrap();

        tracker.transition_task(id, TaskStatus::Done);
        let completed = tracker.get_task(id).unwrap().completed_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        tracker.transition_task(id, TaskStatus::Done);
        assert_eq!(tracker.get_task(id).unwrap().completed_at, completed);
    }

    #[test]
    fn invalid_task_is_not_stored() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        let outcome = tracker.create_task(
            project_id,
            NewTask {
                estimated_hours: Some(-2.0),
                ..NewTask::titled("")
            },
        );
        assert!(matches!(outcome, CreateOutcome::Invalid(ref e) if e.len() == 2));
        assert_eq!(tracker.count_tasks(project_id, None), 0);
    }

    #[test]
    fn task_update_validates_title_and_hours() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        let id = tracker.quick_add_task(project_id, "Write spec").id().unwrap();

        let update = TaskUpdate {
            title: Some("   ".into()),
            estimated_hours: Some(Some(-1.0)),
            ..Default::default()
        };
        assert_eq!(tracker.update_task(id, update).map_err(|e| e.len()), Err(2));

        let update = TaskUpdate {
            estimated_hours: Some(Some(3.0)),
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        assert_eq!(tracker.update_task(id, update), Ok(true));
        let task = tracker.get_task(id).unwrap();
        assert_eq!(task.estimated_hours, Some(3.0));
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn tag_distribution_over_stored_tasks() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        for tags in ["Dev, Test", "Dev", " , Design "] {
            tracker.create_task(
                project_id,
                NewTask {
                    tags: Some(tags.into()),
                    ..NewTask::titled("t")
                },
            );
        }

        let tags = tag_distribution(&tracker.list_tasks(project_id, None));
        let counts: Vec<(&str, usize)> = tags.iter().map(|t| (t.tag.as_str(), t.count)).collect();
        assert!(counts.contains(&("Dev", 2)));
        assert!(counts.contains(&("Test", 1)));
        assert!(counts.contains(&("Design", 1)));
        assert_eq!(counts.len(), 3);
    }
}

mod checklist_tests {
    use super::*;

    #[test]
    fn bulk_add_skips_blank_lines() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        let task = tracker.quick_add_task(project_id, "Write spec").id().unwrap();

        let added = tracker.add_checklist_items(task, "outline\n\n  draft  \n   \nreview");
        assert_eq!(added, 3);

        let items = tracker.list_checklist_items(task);
        let contents: Vec<&str> = items.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, vec!["outline", "draft", "review"]);
        assert!(items.iter().all(|i| !i.is_checked));

        assert!(matches!(
            tracker.add_checklist_item(task, "  "),
            CreateOutcome::Invalid(_)
        ));
    }

    #[test]
    fn toggle_and_delete() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        let task = tracker.quick_add_task(project_id, "Write spec").id().unwrap();
        let item = tracker.add_checklist_item(task, "outline").id().unwrap();

        assert!(tracker.set_checklist_item_checked(item, true));
        assert!(tracker.list_checklist_items(task)[0].is_checked);
        assert_eq!(tracker.checklist_item_task(item), Some(task));
        assert!(tracker.delete_checklist_item(item));
        assert!(!tracker.delete_checklist_item(item));
    }
}

mod milestone_tests {
    use super::*;

    #[test]
    fn milestone_needs_title_and_date() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        let outcome = tracker.create_milestone(project_id, NewMilestone::default());
        assert!(matches!(outcome, CreateOutcome::Invalid(ref e) if e.len() == 2));
        assert!(tracker.list_milestones(project_id).is_empty());
    }

    #[test]
    fn toggle_and_order() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        let ga = tracker
            .create_milestone(
                project_id,
                NewMilestone {
                    title: "GA".into(),
                    target_date: Some(date(2024, 9, 1)),
                    ..Default::default()
                },
            )
            .id()
            .unwrap();
        let beta = tracker
            .create_milestone(
                project_id,
                NewMilestone {
                    title: "Beta".into(),
                    description: Some("  ".into()),
                    target_date: Some(date(2024, 6, 1)),
                },
            )
            .id()
            .unwrap();

        let titles: Vec<String> = tracker
            .list_milestones(project_id)
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Beta", "GA"]);
        assert!(tracker.get_milestone(beta).unwrap().description.is_none());

        assert!(tracker.set_milestone_completed(ga, true));
        assert!(tracker.get_milestone(ga).unwrap().completed_at.is_some());
        assert!(tracker.set_milestone_completed(ga, false));
        assert!(tracker.get_milestone(ga).unwrap().completed_at.is_none());
        assert!(tracker.delete_milestone(ga));
    }
}

mod retrospective_tests {
    use super::*;

    #[test]
    fn created_once_then_updated() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        let input = RetrospectiveInput {
            keep_content: Some("pairing".into()),
            try_content: Some("   ".into()),
            ..Default::default()
        };
        assert!(tracker.create_retrospective(project_id, input.clone()).is_created());
        assert!(matches!(
            tracker.create_retrospective(project_id, input),
            CreateOutcome::Invalid(_)
        ));

        let retro = tracker.get_retrospective(project_id).unwrap();
        assert_eq!(retro.keep_content.as_deref(), Some("pairing"));
        assert!(retro.try_content.is_none());
    }

    #[test]
    fn save_creates_then_updates() {
        let tracker = setup_tracker();
        let project_id = create_project(&tracker, "Demo");
        assert!(!tracker.update_retrospective(project_id, RetrospectiveInput::default()));

        let first = RetrospectiveInput {
            keep_content: Some("v1".into()),
            ..Default::default()
        };
        assert!(tracker.save_retrospective(project_id, first));
        let second = RetrospectiveInput {
            keep_content: Some("v2".into()),
            learning_content: Some("ship smaller".into()),
            ..Default::default()
        };
        assert!(tracker.save_retrospective(project_id, second));

        let summaries = tracker.list_retrospectives(None);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].project_name, "Demo");
        assert_eq!(
            summaries[0].retrospective.keep_content.as_deref(),
            Some("v2")
        );
    }
}

mod auth_tests {
    use super::*;

    #[test]
    fn signup_then_login() {
        let tracker = setup_tracker();
        let id = tracker.signup(signup_input("a@example.com")).id().unwrap();

        let user = tracker.login("a@example.com", "secret1").unwrap();
        assert_eq!(user.id, id);
        assert!(tracker.get_user(id).unwrap().last_login.is_some());
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let tracker = setup_tracker();
        tracker.signup(signup_input("a@example.com"));
        assert!(tracker.login("a@example.com", "wrong").is_none());
        assert!(tracker.login("nobody@example.com", "secret1").is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let tracker = setup_tracker();
        assert!(tracker.signup(signup_input("a@example.com")).is_created());
        assert_eq!(
            tracker.signup(signup_input("a@example.com")),
            CreateOutcome::Invalid(vec!["This email is already registered".to_string()])
        );
    }

    #[test]
    fn emails_ignore_case() {
        let tracker = setup_tracker();
        let id = tracker.signup(signup_input("dev@example.com")).id().unwrap();
        assert_eq!(
            tracker.signup(signup_input("Dev@Example.com")),
            CreateOutcome::Invalid(vec!["This email is already registered".to_string()])
        );

        let user = tracker.login("DEV@example.com", "secret1").unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "dev@example.com");
    }

    #[test]
    fn minimum_password_length_is_configurable() {
        let tracker = setup_tracker().with_min_password_len(10);
        let outcome = tracker.signup(signup_input("a@example.com"));
        assert_eq!(
            outcome,
            CreateOutcome::Invalid(vec!["Password must be at least 10 characters".to_string()])
        );
    }
}
