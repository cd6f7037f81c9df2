use chrono::{Duration, Utc};
use okrfolio_common::requests::{
    InitiativeChanges, KeyResultChanges, NewAccount, NewInitiative, NewKeyResult, NewMilestone,
    NewObjective, NewProject, NewRedFlag, ObjectiveChanges, ProjectChanges,
};
use okrfolio_common::types::{
    Category, InitiativeFilter, InitiativeStatus, Level, OkrStatus, Priority, ProjectFilter,
    ProjectStatus, Severity,
};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tempfile::TempDir;

use crate::entities::{initiative, key_result, milestone, objective, project, red_flag};
use crate::PortfolioStore;

async fn setup() -> (TempDir, PortfolioStore) {
    okrfolio_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let store = PortfolioStore::new(&url, dir.path())
        .await
        .unwrap()
        .with_password_cost(4);
    (dir, store)
}

async fn account(store: &PortfolioStore, email: &str) -> String {
    store
        .create_user(&NewAccount {
            email: email.to_string(),
            password: "password123".to_string(),
            name: None,
        })
        .await
        .unwrap()
        .expect("fresh e-mail should register")
        .id
}

fn new_project(title: &str, status: ProjectStatus, progress: i32) -> NewProject {
    NewProject {
        title: title.to_string(),
        description: String::new(),
        category: Category::Work,
        status,
        priority: Priority::Medium,
        progress,
        start_date: None,
        target_end_date: None,
        actual_end_date: None,
        tags: vec!["q1".to_string()],
    }
}

fn new_milestone(title: &str, days_from_now: i64) -> NewMilestone {
    NewMilestone {
        title: title.to_string(),
        description: String::new(),
        date: Utc::now() + Duration::days(days_from_now),
        category: None,
    }
}

fn new_flag(title: &str, severity: Severity) -> NewRedFlag {
    NewRedFlag {
        title: title.to_string(),
        description: String::new(),
        severity,
    }
}

fn key_result(description: &str, current: f64, target: f64) -> NewKeyResult {
    NewKeyResult {
        description: description.to_string(),
        target,
        current,
        unit: "pts".to_string(),
        status: OkrStatus::NotStarted,
    }
}

fn new_objective(title: &str, status: OkrStatus, key_results: Vec<NewKeyResult>) -> NewObjective {
    NewObjective {
        title: title.to_string(),
        description: String::new(),
        category: Category::Learning,
        status,
        progress: 0,
        quarter: Some("2024-Q1".to_string()),
        target_date: None,
        key_results,
    }
}

fn new_initiative(title: &str, status: InitiativeStatus, priority: Priority) -> NewInitiative {
    NewInitiative {
        title: title.to_string(),
        description: String::new(),
        category: Category::Music,
        status,
        priority,
        estimated_effort: Some(Level::Low),
        potential_impact: None,
        notes: String::new(),
    }
}

#[tokio::test]
async fn duplicate_email_is_rejected_and_credentials_verify() {
    let (_dir, store) = setup().await;
    account(&store, "a@example.com").await;

    let again = store
        .create_user(&NewAccount {
            email: "a@example.com".to_string(),
            password: "other-password".to_string(),
            name: Some("A".to_string()),
        })
        .await
        .unwrap();
    assert!(again.is_none());

    assert!(store
        .verify_credentials("a@example.com", "password123")
        .await
        .unwrap()
        .is_some());
    assert!(store
        .verify_credentials("a@example.com", "wrong")
        .await
        .unwrap()
        .is_none());
    assert!(store
        .verify_credentials("nobody@example.com", "password123")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn concurrent_registrations_of_one_email_yield_one_account() {
    let (_dir, store) = setup().await;
    let new_account = NewAccount {
        email: "race@example.com".to_string(),
        password: "password123".to_string(),
        name: None,
    };

    let (first, second) = tokio::join!(
        store.create_user(&new_account),
        store.create_user(&new_account)
    );
    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(
        usize::from(first.is_some()) + usize::from(second.is_some()),
        1,
        "exactly one registration should win"
    );

    let winner = first.or(second).unwrap();
    let stored = store
        .get_user_by_email("race@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, winner.id);
}

#[tokio::test]
async fn project_round_trip_with_children() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;

    let created = store
        .create_project(&owner, &new_project("Album", ProjectStatus::Active, 40))
        .await
        .unwrap();
    assert!(!created.id.is_empty());
    assert!(created.milestones.is_empty());

    let late = store
        .add_milestone(&owner, &created.id, &new_milestone("Mix", 20))
        .await
        .unwrap()
        .unwrap();
    let early = store
        .add_milestone(&owner, &created.id, &new_milestone("Record", 5))
        .await
        .unwrap()
        .unwrap();
    assert!(!early.completed);
    assert_eq!(early.category, Category::Work);

    let flag = store
        .add_red_flag(&owner, &created.id, &new_flag("Budget", Severity::High))
        .await
        .unwrap()
        .unwrap();
    assert!(!flag.resolved);

    let fetched = store.get_project(&owner, &created.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Album");
    assert_eq!(fetched.progress, 40);
    assert_eq!(fetched.tags, vec!["q1".to_string()]);
    let order: Vec<&str> = fetched.milestones.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(order, vec![early.id.as_str(), late.id.as_str()]);
    assert_eq!(fetched.red_flags.len(), 1);
}

#[tokio::test]
async fn deleting_a_project_removes_its_children() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let project = store
        .create_project(&owner, &new_project("Marathon", ProjectStatus::Planning, 0))
        .await
        .unwrap();
    store
        .add_milestone(&owner, &project.id, &new_milestone("10k", 3))
        .await
        .unwrap();
    store
        .add_red_flag(&owner, &project.id, &new_flag("Injury", Severity::Critical))
        .await
        .unwrap();

    assert!(store.delete_project(&owner, &project.id).await.unwrap());
    assert!(store.get_project(&owner, &project.id).await.unwrap().is_none());
    assert!(!store.delete_project(&owner, &project.id).await.unwrap());

    let milestones = milestone::Entity::find()
        .filter(milestone::Column::ProjectId.eq(project.id.as_str()))
        .count(store.db())
        .await
        .unwrap();
    let flags = red_flag::Entity::find()
        .filter(red_flag::Column::ProjectId.eq(project.id.as_str()))
        .count(store.db())
        .await
        .unwrap();
    assert_eq!((milestones, flags), (0, 0));
}

#[tokio::test]
async fn other_accounts_see_nothing() {
    let (_dir, store) = setup().await;
    let alice = account(&store, "alice@example.com").await;
    let bob = account(&store, "bob@example.com").await;

    let project = store
        .create_project(&alice, &new_project("Secret", ProjectStatus::Active, 10))
        .await
        .unwrap();
    let objective = store
        .create_objective(&alice, &new_objective("Learn", OkrStatus::OnTrack, vec![]))
        .await
        .unwrap();
    let initiative = store
        .create_initiative(
            &alice,
            &new_initiative("Band", InitiativeStatus::Idea, Priority::Low),
        )
        .await
        .unwrap();
    let gig = store
        .add_milestone(&alice, &project.id, &new_milestone("Gig", 4))
        .await
        .unwrap()
        .unwrap();
    let flag = store
        .add_red_flag(&alice, &project.id, &new_flag("Venue", Severity::High))
        .await
        .unwrap()
        .unwrap();
    let graded = store
        .create_objective(
            &alice,
            &new_objective("Grade", OkrStatus::OnTrack, vec![key_result("Exams", 1.0, 4.0)]),
        )
        .await
        .unwrap();
    let kr_id = graded.key_results[0].id.clone();

    assert!(store.get_project(&bob, &project.id).await.unwrap().is_none());
    assert!(store
        .update_project(&bob, &project.id, &ProjectChanges::default())
        .await
        .unwrap()
        .is_none());
    assert!(!store.delete_project(&bob, &project.id).await.unwrap());
    assert!(store
        .add_milestone(&bob, &project.id, &new_milestone("x", 1))
        .await
        .unwrap()
        .is_none());
    assert!(store
        .list_projects(&bob, &ProjectFilter::default())
        .await
        .unwrap()
        .is_empty());

    assert!(store
        .toggle_milestone(&bob, &project.id, &gig.id)
        .await
        .unwrap()
        .is_none());
    assert!(store
        .add_red_flag(&bob, &project.id, &new_flag("Planted", Severity::Low))
        .await
        .unwrap()
        .is_none());
    assert!(store
        .resolve_red_flag(&bob, &project.id, &flag.id)
        .await
        .unwrap()
        .is_none());

    assert!(store.get_objective(&bob, &objective.id).await.unwrap().is_none());
    assert!(store
        .update_objective(
            &bob,
            &objective.id,
            &ObjectiveChanges {
                title: Some("Stolen".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .is_none());
    assert!(store
        .update_key_result(
            &bob,
            &graded.id,
            &kr_id,
            &KeyResultChanges {
                current: Some(4.0),
                status: None,
            },
        )
        .await
        .unwrap()
        .is_none());
    assert!(!store.delete_objective(&bob, &objective.id).await.unwrap());

    assert!(store.get_initiative(&bob, &initiative.id).await.unwrap().is_none());
    assert!(store
        .update_initiative(
            &bob,
            &initiative.id,
            &InitiativeChanges {
                notes: Some("mine now".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .is_none());
    assert!(!store.delete_initiative(&bob, &initiative.id).await.unwrap());

    // Untouched for the real owner.
    let kept = store.get_project(&alice, &project.id).await.unwrap().unwrap();
    assert_eq!(kept.title, "Secret");
    assert_eq!(kept.updated_at, project.updated_at);
    assert_eq!(kept.milestones.len(), 1);
    assert!(!kept.milestones[0].completed);
    assert_eq!(kept.red_flags.len(), 1);
    assert!(!kept.red_flags[0].resolved);

    let kept = store.get_objective(&alice, &objective.id).await.unwrap().unwrap();
    assert_eq!(kept.title, "Learn");
    let kept = store.get_objective(&alice, &graded.id).await.unwrap().unwrap();
    assert_eq!(kept.key_results[0].current, 1.0);
    assert_eq!(kept.progress, 25);

    let kept = store.get_initiative(&alice, &initiative.id).await.unwrap().unwrap();
    assert_eq!(kept.notes, "");
}

#[tokio::test]
async fn partial_update_keeps_unspecified_fields() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let mut input = new_project("Course", ProjectStatus::Active, 20);
    input.target_end_date = Some(Utc::now() + Duration::days(90));
    let project = store.create_project(&owner, &input).await.unwrap();

    let changes = ProjectChanges {
        progress: Some(55),
        target_end_date: Some(None),
        ..Default::default()
    };
    let updated = store
        .update_project(&owner, &project.id, &changes)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.progress, 55);
    assert_eq!(updated.title, "Course");
    assert_eq!(updated.status, ProjectStatus::Active);
    assert!(updated.target_end_date.is_none());
    assert!(updated.updated_at >= project.updated_at);
}

#[tokio::test]
async fn list_projects_filters_and_orders_by_recent_update() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let first = store
        .create_project(&owner, &new_project("First", ProjectStatus::Active, 0))
        .await
        .unwrap();
    let second = store
        .create_project(&owner, &new_project("Second", ProjectStatus::OnHold, 0))
        .await
        .unwrap();

    let all = store
        .list_projects(&owner, &ProjectFilter::default())
        .await
        .unwrap();
    assert_eq!(all[0].id, second.id);

    store
        .update_project(
            &owner,
            &first.id,
            &ProjectChanges {
                description: Some("touched".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let all = store
        .list_projects(&owner, &ProjectFilter::default())
        .await
        .unwrap();
    assert_eq!(all[0].id, first.id);

    let on_hold = store
        .list_projects(
            &owner,
            &ProjectFilter {
                status: Some(ProjectStatus::OnHold),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(on_hold.len(), 1);
    assert_eq!(on_hold[0].id, second.id);
}

#[tokio::test]
async fn equal_update_times_fall_back_to_id_descending() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    for i in 0..3 {
        store
            .create_project(&owner, &new_project(&format!("P{i}"), ProjectStatus::Active, 0))
            .await
            .unwrap();
        store
            .create_objective(&owner, &new_objective(&format!("O{i}"), OkrStatus::OnTrack, vec![]))
            .await
            .unwrap();
        store
            .create_initiative(
                &owner,
                &new_initiative(&format!("I{i}"), InitiativeStatus::Idea, Priority::Low),
            )
            .await
            .unwrap();
    }

    let same = Utc::now().fixed_offset();
    project::Entity::update_many()
        .col_expr(project::Column::UpdatedAt, Expr::value(same))
        .filter(project::Column::UserId.eq(owner.as_str()))
        .exec(store.db())
        .await
        .unwrap();
    objective::Entity::update_many()
        .col_expr(objective::Column::UpdatedAt, Expr::value(same))
        .filter(objective::Column::UserId.eq(owner.as_str()))
        .exec(store.db())
        .await
        .unwrap();
    initiative::Entity::update_many()
        .col_expr(initiative::Column::UpdatedAt, Expr::value(same))
        .filter(initiative::Column::UserId.eq(owner.as_str()))
        .exec(store.db())
        .await
        .unwrap();

    let descending = |mut ids: Vec<String>| {
        ids.sort_by(|a, b| b.cmp(a));
        ids
    };

    let projects = store
        .list_projects(&owner, &ProjectFilter::default())
        .await
        .unwrap();
    let listed: Vec<String> = projects.iter().map(|p| p.id.clone()).collect();
    assert_eq!(listed, descending(listed.clone()));

    let summary = store.dashboard_summary(&owner).await.unwrap();
    let recent: Vec<String> = summary.recent_projects.iter().map(|p| p.id.clone()).collect();
    assert_eq!(recent, listed);
    let recent: Vec<String> = summary.recent_objectives.iter().map(|o| o.id.clone()).collect();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent, descending(recent.clone()));
    let recent: Vec<String> = summary.recent_initiatives.iter().map(|i| i.id.clone()).collect();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent, descending(recent.clone()));
}

#[tokio::test]
async fn toggling_a_milestone_leaves_the_project_untouched() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let project = store
        .create_project(&owner, &new_project("Album", ProjectStatus::Active, 0))
        .await
        .unwrap();
    let milestone = store
        .add_milestone(&owner, &project.id, &new_milestone("Demo", 2))
        .await
        .unwrap()
        .unwrap();

    let toggled = store
        .toggle_milestone(&owner, &project.id, &milestone.id)
        .await
        .unwrap()
        .unwrap();
    assert!(toggled.completed);
    let toggled = store
        .toggle_milestone(&owner, &project.id, &milestone.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!toggled.completed);

    let reloaded = store.get_project(&owner, &project.id).await.unwrap().unwrap();
    assert_eq!(reloaded.updated_at, project.updated_at);

    assert!(store
        .toggle_milestone(&owner, &project.id, "missing")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn resolving_twice_keeps_the_flag_resolved() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let project = store
        .create_project(&owner, &new_project("Album", ProjectStatus::Active, 0))
        .await
        .unwrap();
    let flag = store
        .add_red_flag(&owner, &project.id, &new_flag("Studio", Severity::Medium))
        .await
        .unwrap()
        .unwrap();

    let first = store
        .resolve_red_flag(&owner, &project.id, &flag.id)
        .await
        .unwrap()
        .unwrap();
    assert!(first.resolved);
    assert!(first.resolved_at.is_some());

    let second = store
        .resolve_red_flag(&owner, &project.id, &flag.id)
        .await
        .unwrap()
        .unwrap();
    assert!(second.resolved);
    assert_eq!(second.resolved_at, first.resolved_at);
}

#[tokio::test]
async fn objective_progress_follows_key_results() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let objective = store
        .create_objective(
            &owner,
            &new_objective(
                "Grow",
                OkrStatus::OnTrack,
                vec![key_result("Revenue", 50.0, 100.0), key_result("Users", 30.0, 40.0)],
            ),
        )
        .await
        .unwrap();
    assert_eq!(objective.progress, 63);
    assert_eq!(objective.key_results.len(), 2);
    assert_eq!(objective.key_results[0].description, "Revenue");

    let kr = &objective.key_results[0];
    let updated = store
        .update_key_result(
            &owner,
            &objective.id,
            &kr.id,
            &KeyResultChanges {
                current: Some(100.0),
                status: Some(OkrStatus::Completed),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.current, 100.0);
    assert_eq!(updated.status, OkrStatus::Completed);

    let reloaded = store.get_objective(&owner, &objective.id).await.unwrap().unwrap();
    // (100% + 75%) / 2 = 87.5
    assert_eq!(reloaded.progress, 88);
    assert_eq!(reloaded.updated_at, objective.updated_at);
}

#[tokio::test]
async fn objective_without_key_results_uses_stored_progress() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let mut input = new_objective("Read", OkrStatus::AtRisk, vec![]);
    input.progress = 30;
    let objective = store.create_objective(&owner, &input).await.unwrap();
    assert_eq!(objective.progress, 30);

    let updated = store
        .update_objective(
            &owner,
            &objective.id,
            &ObjectiveChanges {
                progress: Some(45),
                quarter: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.progress, 45);
    assert!(updated.quarter.is_none());
    assert_eq!(updated.status, OkrStatus::AtRisk);
}

#[tokio::test]
async fn deleting_an_objective_removes_its_key_results() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let objective = store
        .create_objective(
            &owner,
            &new_objective("Grow", OkrStatus::OnTrack, vec![key_result("Runs", 1.0, 10.0)]),
        )
        .await
        .unwrap();

    assert!(store.delete_objective(&owner, &objective.id).await.unwrap());
    let remaining = key_result::Entity::find()
        .filter(key_result::Column::ObjectiveId.eq(objective.id.as_str()))
        .count(store.db())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn initiatives_filter_and_update() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let idea = store
        .create_initiative(
            &owner,
            &new_initiative("Podcast", InitiativeStatus::Idea, Priority::High),
        )
        .await
        .unwrap();
    store
        .create_initiative(
            &owner,
            &new_initiative("Blog", InitiativeStatus::InProgress, Priority::Low),
        )
        .await
        .unwrap();

    let ideas = store
        .list_initiatives(
            &owner,
            &InitiativeFilter {
                status: Some(InitiativeStatus::Idea),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0].estimated_effort, Some(Level::Low));

    let updated = store
        .update_initiative(
            &owner,
            &idea.id,
            &InitiativeChanges {
                estimated_effort: Some(None),
                potential_impact: Some(Some(Level::High)),
                notes: Some("ask around".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.estimated_effort, None);
    assert_eq!(updated.potential_impact, Some(Level::High));
    assert_eq!(updated.notes, "ask around");
    assert_eq!(updated.priority, Priority::High);
}

#[tokio::test]
async fn dashboard_stats_average_only_open_projects() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let other = account(&store, "b@example.com").await;

    let active = store
        .create_project(&owner, &new_project("A", ProjectStatus::Active, 40))
        .await
        .unwrap();
    store
        .create_project(&owner, &new_project("C", ProjectStatus::Completed, 100))
        .await
        .unwrap();
    store
        .create_project(&owner, &new_project("P", ProjectStatus::Planning, 60))
        .await
        .unwrap();
    store
        .create_project(&other, &new_project("Other", ProjectStatus::Active, 0))
        .await
        .unwrap();

    store
        .add_milestone(&owner, &active.id, &new_milestone("soon", 10))
        .await
        .unwrap();
    store
        .add_milestone(&owner, &active.id, &new_milestone("later", 45))
        .await
        .unwrap();
    let flag = store
        .add_red_flag(&owner, &active.id, &new_flag("one", Severity::Low))
        .await
        .unwrap()
        .unwrap();
    store
        .add_red_flag(&owner, &active.id, &new_flag("two", Severity::High))
        .await
        .unwrap();
    store
        .resolve_red_flag(&owner, &active.id, &flag.id)
        .await
        .unwrap();

    store
        .create_objective(&owner, &new_objective("O1", OkrStatus::OnTrack, vec![]))
        .await
        .unwrap();
    store
        .create_objective(&owner, &new_objective("O2", OkrStatus::AtRisk, vec![]))
        .await
        .unwrap();
    store
        .create_initiative(
            &owner,
            &new_initiative("I", InitiativeStatus::InProgress, Priority::Medium),
        )
        .await
        .unwrap();

    let stats = store.dashboard_stats(&owner, Utc::now(), 30).await.unwrap();
    assert_eq!(stats.projects.total, 3);
    assert_eq!(stats.projects.active, 1);
    assert_eq!(stats.projects.completed, 1);
    assert_eq!(stats.projects.avg_progress, 50);
    assert_eq!(stats.objectives.total, 2);
    assert_eq!(stats.objectives.on_track, 1);
    assert_eq!(stats.objectives.at_risk, 1);
    assert_eq!(stats.initiatives.total, 1);
    assert_eq!(stats.initiatives.in_progress, 1);
    assert_eq!(stats.red_flags.unresolved, 1);
    assert_eq!(stats.milestones.upcoming, 1);
}

#[tokio::test]
async fn dashboard_stats_are_zero_for_an_empty_account() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let stats = store.dashboard_stats(&owner, Utc::now(), 30).await.unwrap();
    assert_eq!(stats, Default::default());
}

#[tokio::test]
async fn dashboard_summary_limits_and_filters() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;

    let mut last = None;
    for i in 0..6 {
        let project = store
            .create_project(&owner, &new_project(&format!("P{i}"), ProjectStatus::Active, 0))
            .await
            .unwrap();
        last = Some(project);
    }
    let last = last.unwrap();
    for day in [9, 2, 5, 1] {
        store
            .add_milestone(&owner, &last.id, &new_milestone(&format!("d{day}"), day))
            .await
            .unwrap();
    }
    let low = store
        .add_red_flag(&owner, &last.id, &new_flag("low", Severity::Low))
        .await
        .unwrap()
        .unwrap();
    let critical = store
        .add_red_flag(&owner, &last.id, &new_flag("critical", Severity::Critical))
        .await
        .unwrap()
        .unwrap();
    let high = store
        .add_red_flag(&owner, &last.id, &new_flag("high", Severity::High))
        .await
        .unwrap()
        .unwrap();
    store
        .resolve_red_flag(&owner, &last.id, &low.id)
        .await
        .unwrap();

    let summary = store.dashboard_summary(&owner).await.unwrap();
    assert_eq!(summary.recent_projects.len(), 5);
    let newest = &summary.recent_projects[0];
    assert_eq!(newest.id, last.id);
    let titles: Vec<&str> = newest.milestones.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["d1", "d2", "d5"]);
    assert_eq!(newest.red_flags.len(), 2);
    assert!(newest.red_flags.iter().all(|f| !f.resolved));

    let critical_ids: Vec<&str> = summary
        .critical_red_flags
        .iter()
        .map(|f| f.red_flag.id.as_str())
        .collect();
    assert_eq!(critical_ids, vec![high.id.as_str(), critical.id.as_str()]);
    assert_eq!(summary.critical_red_flags[0].project.title, "P5");
}

#[tokio::test]
async fn red_flag_board_ranks_by_severity() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let project = store
        .create_project(&owner, &new_project("Album", ProjectStatus::Active, 0))
        .await
        .unwrap();
    for (title, severity) in [
        ("a", Severity::Low),
        ("b", Severity::Critical),
        ("c", Severity::Medium),
        ("d", Severity::Critical),
    ] {
        store
            .add_red_flag(&owner, &project.id, &new_flag(title, severity))
            .await
            .unwrap();
    }

    let board = store.red_flag_board(&owner).await.unwrap();
    let titles: Vec<&str> = board.iter().map(|f| f.red_flag.title.as_str()).collect();
    assert_eq!(titles, vec!["d", "b", "c", "a"]);
}

#[tokio::test]
async fn upcoming_milestones_and_timeline() {
    let (_dir, store) = setup().await;
    let owner = account(&store, "a@example.com").await;
    let project = store
        .create_project(&owner, &new_project("Album", ProjectStatus::Active, 0))
        .await
        .unwrap();
    let soon = store
        .add_milestone(&owner, &project.id, &new_milestone("soon", 3))
        .await
        .unwrap()
        .unwrap();
    let done = store
        .add_milestone(&owner, &project.id, &new_milestone("done", 4))
        .await
        .unwrap()
        .unwrap();
    store
        .toggle_milestone(&owner, &project.id, &done.id)
        .await
        .unwrap();
    store
        .add_milestone(&owner, &project.id, &new_milestone("far", 120))
        .await
        .unwrap();
    store
        .add_milestone(&owner, &project.id, &new_milestone("past", -40))
        .await
        .unwrap();

    let now = Utc::now();
    let upcoming = store.upcoming_milestones(&owner, now, 30).await.unwrap();
    let ids: Vec<&str> = upcoming.iter().map(|m| m.milestone.id.as_str()).collect();
    assert_eq!(ids, vec![soon.id.as_str()]);
    assert_eq!(upcoming[0].project.title, "Album");

    let all = store
        .milestone_timeline(&owner, None, false, now)
        .await
        .unwrap();
    let count: usize = all.iter().map(|m| m.milestones.len()).sum();
    assert_eq!(count, 4);
    assert!(all.windows(2).all(|w| w[0].month < w[1].month));

    let ahead = store
        .milestone_timeline(&owner, None, true, now)
        .await
        .unwrap();
    let titles: Vec<&str> = ahead
        .iter()
        .flat_map(|m| m.milestones.iter().map(|i| i.milestone.title.as_str()))
        .collect();
    assert_eq!(titles, vec!["soon", "far"]);

    let other_category = store
        .milestone_timeline(&owner, Some(Category::Music), false, now)
        .await
        .unwrap();
    assert!(other_category.is_empty());
}
