//! Pure derivation rules shared by the server's aggregation and the client's
//! display ordering. Nothing here performs I/O.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::requests::NewKeyResult;
use crate::types::{
    KeyResult, Milestone, MilestoneWithProject, Priority, Severity, TimelineMonth,
};

/// Default look-ahead for upcoming milestones, in days.
pub const UPCOMING_WINDOW_DAYS: i64 = 30;

/// Largest accepted look-ahead, in days.
pub const MAX_UPCOMING_WINDOW_DAYS: i64 = 365;

/// Position in the shared rank table: critical 0, high 1, medium 2, low 3.
pub trait Ranked {
    fn rank(&self) -> u8;
}

impl Ranked for Priority {
    fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl Ranked for Severity {
    fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }
}

/// Anything carrying a key-result measurement.
pub trait Measured {
    fn description(&self) -> &str;
    fn current(&self) -> f64;
    fn target(&self) -> f64;
}

impl Measured for KeyResult {
    fn description(&self) -> &str {
        &self.description
    }
    fn current(&self) -> f64 {
        self.current
    }
    fn target(&self) -> f64 {
        self.target
    }
}

impl Measured for NewKeyResult {
    fn description(&self) -> &str {
        &self.description
    }
    fn current(&self) -> f64 {
        self.current
    }
    fn target(&self) -> f64 {
        self.target
    }
}

/// Rounds to the nearest integer with halves rounded up
/// (`62.5 -> 63`, `-0.5 -> 0`).
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

pub fn clamp_progress(value: i32) -> i32 {
    value.clamp(0, 100)
}

/// `current / target * 100`, or 0 when the target is not positive.
pub fn key_result_ratio<M: Measured>(kr: &M) -> f64 {
    let target = kr.target();
    if target <= 0.0 || !target.is_finite() {
        return 0.0;
    }
    kr.current() / target * 100.0
}

/// Progress of an objective derived from its key results, or `None` when no
/// key result has a non-blank description.
pub fn derived_progress<M: Measured>(key_results: &[M]) -> Option<i32> {
    let ratios: Vec<f64> = key_results
        .iter()
        .filter(|kr| !kr.description().trim().is_empty())
        .map(key_result_ratio)
        .collect();
    if ratios.is_empty() {
        return None;
    }
    let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
    Some(clamp_progress(round_half_up(mean)))
}

/// Mean key-result completion in 0..=100; 0 when nothing qualifies.
pub fn compute_objective_progress<M: Measured>(key_results: &[M]) -> i32 {
    derived_progress(key_results).unwrap_or(0)
}

/// Rounded mean of the given progress values, 0 for an empty input.
pub fn average_progress(values: &[i32]) -> i32 {
    if values.is_empty() {
        return 0;
    }
    let sum: i64 = values.iter().map(|v| i64::from(*v)).sum();
    round_half_up(sum as f64 / values.len() as f64)
}

/// Stable sort by rank. Items of equal rank keep their input order.
pub fn rank_by_severity_or_priority<T, R, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    R: Ranked,
    F: Fn(&T) -> R,
{
    items.sort_by_key(|item| key(item).rank());
    items
}

/// True when the milestone is incomplete and dated within
/// `[now, now + window_days]`, both ends inclusive.
pub fn is_milestone_upcoming(milestone: &Milestone, now: DateTime<Utc>, window_days: i64) -> bool {
    if milestone.completed {
        return false;
    }
    let until = milestone.date - now;
    until >= Duration::zero() && until <= Duration::days(window_days)
}

/// Groups milestones by calendar month (`YYYY-MM`), months ascending and
/// milestones by date inside each month.
pub fn group_by_month(mut milestones: Vec<MilestoneWithProject>) -> Vec<TimelineMonth> {
    milestones.sort_by(|a, b| {
        a.milestone
            .date
            .cmp(&b.milestone.date)
            .then_with(|| a.milestone.id.cmp(&b.milestone.id))
    });
    let mut months: BTreeMap<String, Vec<MilestoneWithProject>> = BTreeMap::new();
    for item in milestones {
        let key = item.milestone.date.format("%Y-%m").to_string();
        months.entry(key).or_default().push(item);
    }
    months
        .into_iter()
        .map(|(month, milestones)| TimelineMonth { month, milestones })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, OkrStatus, ProjectRef};
    use chrono::TimeZone;

    fn kr(description: &str, current: f64, target: f64) -> NewKeyResult {
        NewKeyResult {
            description: description.to_string(),
            target,
            current,
            unit: "units".to_string(),
            status: OkrStatus::OnTrack,
        }
    }

    fn milestone(id: &str, date: DateTime<Utc>, completed: bool) -> Milestone {
        Milestone {
            id: id.to_string(),
            project_id: "p1".to_string(),
            title: format!("milestone {id}"),
            description: String::new(),
            date,
            completed,
            category: Category::Work,
            created_at: date,
            updated_at: date,
        }
    }

    #[test]
    fn objective_progress_rounds_half_up() {
        let krs = vec![kr("Revenue", 50.0, 100.0), kr("Users", 30.0, 40.0)];
        assert_eq!(compute_objective_progress(&krs), 63);
    }

    #[test]
    fn objective_progress_is_zero_without_key_results() {
        let empty: Vec<NewKeyResult> = Vec::new();
        assert_eq!(compute_objective_progress(&empty), 0);
        assert_eq!(derived_progress(&empty), None);
    }

    #[test]
    fn blank_descriptions_do_not_count() {
        let krs = vec![kr("  ", 0.0, 100.0), kr("Ship", 100.0, 100.0)];
        assert_eq!(compute_objective_progress(&krs), 100);
        assert_eq!(derived_progress(&[kr("", 10.0, 10.0)]), None);
    }

    #[test]
    fn objective_progress_stays_within_bounds() {
        let overshoot = vec![kr("Runs", 300.0, 100.0)];
        assert_eq!(compute_objective_progress(&overshoot), 100);

        let zero_target = vec![kr("Degenerate", 5.0, 0.0), kr("Half", 1.0, 2.0)];
        assert_eq!(compute_objective_progress(&zero_target), 25);
    }

    #[test]
    fn ranking_is_stable_for_equal_ranks() {
        let items = vec![
            ("A", Severity::Critical),
            ("low", Severity::Low),
            ("B", Severity::Critical),
            ("high", Severity::High),
        ];
        let ranked = rank_by_severity_or_priority(items, |item| item.1);
        let names: Vec<&str> = ranked.iter().map(|item| item.0).collect();
        assert_eq!(names, vec!["A", "B", "high", "low"]);
    }

    #[test]
    fn priority_and_severity_share_the_rank_table() {
        assert_eq!(Priority::Critical.rank(), Severity::Critical.rank());
        assert_eq!(Priority::Low.rank(), 3);
        assert!(Severity::High.rank() < Severity::Medium.rank());
    }

    #[test]
    fn upcoming_window_is_inclusive_at_both_ends() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let window = 30;

        assert!(is_milestone_upcoming(&milestone("1", now, false), now, window));
        assert!(is_milestone_upcoming(
            &milestone("2", now + Duration::days(window), false),
            now,
            window
        ));
        assert!(!is_milestone_upcoming(
            &milestone("3", now + Duration::days(window + 1), false),
            now,
            window
        ));
        assert!(!is_milestone_upcoming(
            &milestone("4", now + Duration::days(3), true),
            now,
            window
        ));
        assert!(!is_milestone_upcoming(
            &milestone("5", now - Duration::hours(1), false),
            now,
            window
        ));
    }

    #[test]
    fn average_progress_of_open_projects() {
        assert_eq!(average_progress(&[40, 60]), 50);
        assert_eq!(average_progress(&[]), 0);
        assert_eq!(average_progress(&[33, 34]), 34);
    }

    #[test]
    fn timeline_groups_by_month_in_order() {
        let project = ProjectRef {
            id: "p1".to_string(),
            title: "Album".to_string(),
        };
        let at = |m: u32, d: u32| Utc.with_ymd_and_hms(2024, m, d, 9, 0, 0).unwrap();
        let items = vec![
            milestone("3", at(3, 2), false),
            milestone("1", at(1, 20), false),
            milestone("2", at(1, 5), true),
        ]
        .into_iter()
        .map(|milestone| MilestoneWithProject {
            milestone,
            project: project.clone(),
        })
        .collect();

        let months = group_by_month(items);
        let keys: Vec<&str> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(keys, vec!["2024-01", "2024-03"]);
        let january: Vec<&str> = months[0]
            .milestones
            .iter()
            .map(|m| m.milestone.id.as_str())
            .collect();
        assert_eq!(january, vec!["2", "1"]);
    }
}
