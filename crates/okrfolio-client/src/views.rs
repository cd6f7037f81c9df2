//! Display-layer filtering and ordering over a [`Snapshot`]. These use the
//! same rank table and upcoming window as the server's dashboard.
//!
//! [`Snapshot`]: crate::workspace::Snapshot

use chrono::{DateTime, Utc};
use okrfolio_common::rules::{is_milestone_upcoming, rank_by_severity_or_priority, Ranked};
use okrfolio_common::types::{
    Initiative, InitiativeFilter, Objective, ObjectiveFilter, OkrStatus, Project, ProjectFilter,
    ProjectRef, ProjectStatus, RedFlagWithProject,
};

pub fn filter_projects<'a>(projects: &'a [Project], filter: &ProjectFilter) -> Vec<&'a Project> {
    projects
        .iter()
        .filter(|p| filter.category.map_or(true, |c| p.category == c))
        .filter(|p| filter.status.map_or(true, |s| p.status == s))
        .filter(|p| filter.priority.map_or(true, |pr| p.priority == pr))
        .collect()
}

pub fn filter_objectives<'a>(
    objectives: &'a [Objective],
    filter: &ObjectiveFilter,
) -> Vec<&'a Objective> {
    objectives
        .iter()
        .filter(|o| filter.status.map_or(true, |s| o.status == s))
        .filter(|o| filter.category.map_or(true, |c| o.category == c))
        .collect()
}

pub fn filter_initiatives<'a>(
    initiatives: &'a [Initiative],
    filter: &InitiativeFilter,
) -> Vec<&'a Initiative> {
    initiatives
        .iter()
        .filter(|i| filter.status.map_or(true, |s| i.status == s))
        .filter(|i| filter.category.map_or(true, |c| i.category == c))
        .filter(|i| filter.priority.map_or(true, |p| i.priority == p))
        .collect()
}

/// Planning and active projects, highest priority first, then by progress
/// descending.
pub fn active_projects(projects: &[Project]) -> Vec<&Project> {
    let mut active: Vec<&Project> = projects
        .iter()
        .filter(|p| matches!(p.status, ProjectStatus::Planning | ProjectStatus::Active))
        .collect();
    active.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then(b.progress.cmp(&a.progress))
    });
    active
}

/// On-track and at-risk objectives, at-risk first, then by progress
/// descending.
pub fn active_objectives(objectives: &[Objective]) -> Vec<&Objective> {
    let mut active: Vec<&Objective> = objectives
        .iter()
        .filter(|o| matches!(o.status, OkrStatus::OnTrack | OkrStatus::AtRisk))
        .collect();
    active.sort_by(|a, b| {
        let rank = |o: &Objective| u8::from(o.status != OkrStatus::AtRisk);
        rank(*a)
            .cmp(&rank(*b))
            .then(b.progress.cmp(&a.progress))
    });
    active
}

/// Unresolved red flags across all projects, most severe first and newest
/// first within a severity.
pub fn red_flag_board(projects: &[Project]) -> Vec<RedFlagWithProject> {
    let mut flags: Vec<RedFlagWithProject> = projects
        .iter()
        .flat_map(|project| {
            project
                .red_flags
                .iter()
                .filter(|flag| !flag.resolved)
                .map(|flag| RedFlagWithProject {
                    red_flag: flag.clone(),
                    project: ProjectRef {
                        id: project.id.clone(),
                        title: project.title.clone(),
                    },
                })
        })
        .collect();
    flags.sort_by(|a, b| {
        b.red_flag
            .created_at
            .cmp(&a.red_flag.created_at)
            .then_with(|| b.red_flag.id.cmp(&a.red_flag.id))
    });
    rank_by_severity_or_priority(flags, |item| item.red_flag.severity)
}

pub fn upcoming_milestone_count(
    projects: &[Project],
    now: DateTime<Utc>,
    window_days: i64,
) -> usize {
    projects
        .iter()
        .flat_map(|p| p.milestones.iter())
        .filter(|m| is_milestone_upcoming(m, now, window_days))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use okrfolio_common::types::{Category, Milestone, Priority, RedFlag, Severity};

    fn project(id: &str, status: ProjectStatus, priority: Priority, progress: i32) -> Project {
        let now = Utc::now();
        Project {
            id: id.into(),
            title: format!("Project {id}"),
            description: String::new(),
            category: Category::Work,
            status,
            priority,
            progress,
            start_date: now,
            target_end_date: None,
            actual_end_date: None,
            tags: Vec::new(),
            milestones: Vec::new(),
            red_flags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn objective(id: &str, status: OkrStatus, progress: i32) -> Objective {
        let now = Utc::now();
        Objective {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            category: Category::Other,
            status,
            progress,
            quarter: None,
            target_date: None,
            key_results: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn flag(id: &str, severity: Severity, resolved: bool, age_mins: i64) -> RedFlag {
        let at = Utc::now() - Duration::minutes(age_mins);
        RedFlag {
            id: id.into(),
            project_id: String::new(),
            title: id.into(),
            description: String::new(),
            severity,
            resolved,
            resolved_at: resolved.then_some(at),
            created_at: at,
            updated_at: at,
        }
    }

    fn milestone(offset_days: i64, completed: bool, now: DateTime<Utc>) -> Milestone {
        Milestone {
            id: offset_days.to_string(),
            project_id: String::new(),
            title: String::new(),
            description: String::new(),
            date: now + Duration::days(offset_days),
            completed,
            category: Category::Work,
            created_at: now,
            updated_at: now,
        }
    }

    fn ids<T, F: Fn(&T) -> &str>(items: &[T], id: F) -> Vec<&str> {
        items.iter().map(id).collect()
    }

    #[test]
    fn active_projects_rank_by_priority_then_progress() {
        let projects = vec![
            project("a", ProjectStatus::Active, Priority::Low, 90),
            project("b", ProjectStatus::Planning, Priority::Critical, 10),
            project("c", ProjectStatus::Active, Priority::Critical, 60),
            project("d", ProjectStatus::Completed, Priority::Critical, 100),
            project("e", ProjectStatus::OnHold, Priority::High, 50),
        ];
        let active = active_projects(&projects);
        assert_eq!(ids(&active, |p| p.id.as_str()), vec!["c", "b", "a"]);
    }

    #[test]
    fn active_objectives_put_at_risk_first() {
        let objectives = vec![
            objective("on-high", OkrStatus::OnTrack, 80),
            objective("risk-low", OkrStatus::AtRisk, 10),
            objective("done", OkrStatus::Completed, 100),
            objective("risk-high", OkrStatus::AtRisk, 40),
            objective("on-low", OkrStatus::OnTrack, 20),
        ];
        let active = active_objectives(&objectives);
        assert_eq!(
            ids(&active, |o| o.id.as_str()),
            vec!["risk-high", "risk-low", "on-high", "on-low"]
        );
    }

    #[test]
    fn red_flag_board_skips_resolved_and_orders_by_severity() {
        let mut first = project("p1", ProjectStatus::Active, Priority::Low, 0);
        first.red_flags = vec![
            flag("low", Severity::Low, false, 1),
            flag("old-critical", Severity::Critical, false, 30),
            flag("resolved", Severity::Critical, true, 2),
        ];
        let mut second = project("p2", ProjectStatus::Active, Priority::Low, 0);
        second.red_flags = vec![
            flag("new-critical", Severity::Critical, false, 5),
            flag("medium", Severity::Medium, false, 3),
        ];

        let board = red_flag_board(&[first, second]);
        assert_eq!(
            ids(&board, |f| f.red_flag.id.as_str()),
            vec!["new-critical", "old-critical", "medium", "low"]
        );
        assert_eq!(board[0].project.id, "p2");
        assert_eq!(board[1].project.title, "Project p1");
    }

    #[test]
    fn upcoming_count_honours_window_and_completion() {
        let now = Utc::now();
        let mut p = project("p", ProjectStatus::Active, Priority::Low, 0);
        p.milestones = vec![
            milestone(-1, false, now),
            milestone(3, false, now),
            milestone(3, true, now),
            milestone(30, false, now),
            milestone(31, false, now),
        ];
        assert_eq!(upcoming_milestone_count(&[p], now, 30), 2);
    }

    #[test]
    fn filters_match_every_given_field() {
        let mut music = project("m", ProjectStatus::Active, Priority::High, 0);
        music.category = Category::Music;
        let projects = vec![
            music,
            project("w", ProjectStatus::Active, Priority::High, 0),
            project("x", ProjectStatus::Planning, Priority::High, 0),
        ];
        let filter = ProjectFilter {
            category: Some(Category::Work),
            status: Some(ProjectStatus::Active),
            priority: None,
        };
        assert_eq!(
            ids(&filter_projects(&projects, &filter), |p| p.id.as_str()),
            vec!["w"]
        );
        assert_eq!(filter_projects(&projects, &ProjectFilter::default()).len(), 3);

        let objectives = vec![
            objective("a", OkrStatus::AtRisk, 0),
            objective("b", OkrStatus::OnTrack, 0),
        ];
        let filter = ObjectiveFilter {
            status: Some(OkrStatus::AtRisk),
            category: None,
        };
        assert_eq!(
            ids(&filter_objectives(&objectives, &filter), |o| o.id.as_str()),
            vec!["a"]
        );
    }
}
