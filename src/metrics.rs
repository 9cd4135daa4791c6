//! Progress metrics computed from in-memory task lists.

use crate::format::local_date_of_ms;
use crate::types::{Priority, Task, TaskStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Percentage of `done` over `total`, rounded to one decimal. 0 when `total` is 0.
pub fn progress_rate(total: usize, done: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(done as f64 / total as f64 * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Headline numbers of a project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
    pub progress_rate: f64,
}

pub fn project_metrics(tasks: &[Task]) -> ProjectMetrics {
    let dist = status_distribution(tasks);
    ProjectMetrics {
        total: tasks.len(),
        todo: dist.todo,
        in_progress: dist.in_progress,
        done: dist.done,
        progress_rate: progress_rate(tasks.len(), dist.done),
    }
}

/// Task counts per board column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDistribution {
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatusDistribution {
    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Todo => self.todo,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Done => self.done,
        }
    }

    pub fn total(&self) -> usize {
        self.todo + self.in_progress + self.done
    }
}

pub fn status_distribution(tasks: &[Task]) -> StatusDistribution {
    let mut dist = StatusDistribution::default();
    for task in tasks {
        match task.status {
            TaskStatus::Todo => dist.todo += 1,
            TaskStatus::InProgress => dist.in_progress += 1,
            TaskStatus::Done => dist.done += 1,
        }
    }
    dist
}

/// Task counts per priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl PriorityDistribution {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
        }
    }
}

pub fn priority_distribution(tasks: &[Task]) -> PriorityDistribution {
    let mut dist = PriorityDistribution::default();
    for task in tasks {
        match task.priority {
            Priority::Low => dist.low += 1,
            Priority::Medium => dist.medium += 1,
            Priority::High => dist.high += 1,
        }
    }
    dist
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Occurrences of each tag, in first-seen order.
///
/// A task tagged `"Dev,Design"` counts once for `Dev` and once for `Design`.
pub fn tag_distribution(tasks: &[Task]) -> Vec<TagCount> {
    let mut counts: Vec<TagCount> = Vec::new();
    for task in tasks {
        for tag in task.tag_list() {
            match counts.iter_mut().find(|c| c.tag == tag) {
                Some(entry) => entry.count += 1,
                None => counts.push(TagCount {
                    tag: tag.to_string(),
                    count: 1,
                }),
            }
        }
    }
    counts
}

/// One day of the completion curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    pub date: NaiveDate,
    pub count: usize,
    pub cumulative: usize,
    pub progress_rate: f64,
}

/// Completed tasks grouped by local completion date, oldest first, with a
/// running total.
///
/// The cumulative rate is measured against the number of tasks in `tasks`
/// now, not the number that existed on each date, so the curve shifts when
/// tasks are added or removed later.
pub fn progress_history(tasks: &[Task]) -> Vec<ProgressPoint> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for task in tasks.iter().filter(|t| t.status == TaskStatus::Done) {
        if let Some(date) = task.completed_at.and_then(local_date_of_ms) {
            *per_day.entry(date).or_default() += 1;
        }
    }

    let total = tasks.len();
    let mut cumulative = 0;
    per_day
        .into_iter()
        .map(|(date, count)| {
            cumulative += count;
            ProgressPoint {
                date,
                count,
                cumulative,
                progress_rate: progress_rate(total, cumulative),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn task(status: TaskStatus, priority: Priority, tags: Option<&str>) -> Task {
        Task {
            id: 0,
            project_id: 1,
            title: "t".into(),
            description: None,
            status,
            priority,
            tags: tags.map(String::from),
            estimated_hours: None,
            due_date: None,
            created_at: 0,
            started_at: None,
            completed_at: None,
        }
    }

    fn done_on(y: i32, m: u32, d: u32) -> Task {
        let ms = Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .unwrap()
            .timestamp_millis();
        Task {
            completed_at: Some(ms),
            ..task(TaskStatus::Done, Priority::Medium, None)
        }
    }

    #[test]
    fn progress_rate_handles_zero_total() {
        assert_eq!(progress_rate(0, 0), 0.0);
    }

    #[test]
    fn progress_rate_rounds_to_one_decimal() {
        assert_eq!(progress_rate(3, 1), 33.3);
        assert_eq!(progress_rate(3, 2), 66.7);
        assert_eq!(progress_rate(4, 4), 100.0);
    }

    #[test]
    fn progress_rate_stays_in_range() {
        for total in 0..40 {
            for done in 0..=total {
                let rate = progress_rate(total, done);
                assert!((0.0..=100.0).contains(&rate), "{done}/{total} gave {rate}");
            }
        }
    }

    #[test]
    fn status_buckets_sum_to_task_count() {
        let tasks = vec![
            task(TaskStatus::Todo, Priority::Low, None),
            task(TaskStatus::Todo, Priority::High, None),
            task(TaskStatus::InProgress, Priority::Medium, None),
            task(TaskStatus::Done, Priority::Medium, None),
        ];
        let dist = status_distribution(&tasks);
        assert_eq!(dist.total(), tasks.len());
        assert_eq!(dist.get(TaskStatus::Todo), 2);

        let prio = priority_distribution(&tasks);
        assert_eq!((prio.low, prio.medium, prio.high), (1, 2, 1));
    }

    #[test]
    fn project_metrics_counts_done_tasks() {
        let tasks = vec![
            task(TaskStatus::Done, Priority::Medium, None),
            task(TaskStatus::Todo, Priority::Medium, None),
        ];
        let metrics = project_metrics(&tasks);
        assert_eq!(metrics.total, 2);
        assert_eq!(metrics.done, 1);
        assert_eq!(metrics.progress_rate, 50.0);
    }

    #[test]
    fn multi_tag_task_counts_in_each_bucket() {
        let tasks = vec![
            task(TaskStatus::Todo, Priority::Medium, Some("Dev,Design")),
            task(TaskStatus::Todo, Priority::Medium, Some("Dev")),
            task(TaskStatus::Todo, Priority::Medium, None),
        ];
        let tags = tag_distribution(&tasks);
        assert_eq!(
            tags,
            vec![
                TagCount { tag: "Dev".into(), count: 2 },
                TagCount { tag: "Design".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn history_is_cumulative_against_current_total() {
        let tasks = vec![
            done_on(2024, 3, 2),
            done_on(2024, 3, 1),
            done_on(2024, 3, 2),
            task(TaskStatus::Todo, Priority::Medium, None),
        ];
        let history = progress_history(&tasks);

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!((history[0].count, history[0].cumulative), (1, 1));
        assert_eq!(history[0].progress_rate, 25.0);
        assert_eq!((history[1].count, history[1].cumulative), (2, 3));
        assert_eq!(history[1].progress_rate, 75.0);
    }

    #[test]
    fn history_skips_done_tasks_without_timestamp() {
        let tasks = vec![task(TaskStatus::Done, Priority::Medium, None)];
        assert!(progress_history(&tasks).is_empty());
    }
}
