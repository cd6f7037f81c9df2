use chrono::{Duration, Utc};
use okrfolio_common::requests::{
    NewAccount, NewInitiative, NewKeyResult, NewMilestone, NewObjective, NewProject, NewRedFlag,
};
use okrfolio_common::types::{
    Category, InitiativeFilter, InitiativeStatus, Level, ObjectiveFilter, OkrStatus, Priority,
    ProjectFilter, ProjectStatus, Severity,
};
use okrfolio_storage::PortfolioStore;

pub const DEMO_EMAIL: &str = "user@example.com";
pub const DEMO_PASSWORD: &str = "password123";
const DEMO_NAME: &str = "Demo User";

struct MilestoneDef {
    title: &'static str,
    /// Days from now; negative dates lie in the past.
    offset_days: i64,
    completed: bool,
}

struct RedFlagDef {
    title: &'static str,
    description: &'static str,
    severity: Severity,
}

struct ProjectDef {
    title: &'static str,
    description: &'static str,
    category: Category,
    status: ProjectStatus,
    priority: Priority,
    progress: i32,
    started_days_ago: i64,
    target_in_days: Option<i64>,
    tags: &'static [&'static str],
    milestones: &'static [MilestoneDef],
    red_flags: &'static [RedFlagDef],
}

struct KeyResultDef {
    description: &'static str,
    target: f64,
    current: f64,
    unit: &'static str,
    status: OkrStatus,
}

struct ObjectiveDef {
    title: &'static str,
    description: &'static str,
    category: Category,
    status: OkrStatus,
    quarter: &'static str,
    key_results: &'static [KeyResultDef],
}

struct InitiativeDef {
    title: &'static str,
    description: &'static str,
    category: Category,
    status: InitiativeStatus,
    priority: Priority,
    effort: Option<Level>,
    impact: Option<Level>,
    notes: &'static str,
}

const DEMO_PROJECTS: &[ProjectDef] = &[
    ProjectDef {
        title: "Company website redesign",
        description: "New information architecture and a faster landing page.",
        category: Category::Work,
        status: ProjectStatus::Active,
        priority: Priority::High,
        progress: 45,
        started_days_ago: 40,
        target_in_days: Some(60),
        tags: &["web", "design"],
        milestones: &[
            MilestoneDef {
                title: "Wireframes approved",
                offset_days: -10,
                completed: true,
            },
            MilestoneDef {
                title: "Beta launch",
                offset_days: 14,
                completed: false,
            },
            MilestoneDef {
                title: "Public launch",
                offset_days: 55,
                completed: false,
            },
        ],
        red_flags: &[RedFlagDef {
            title: "Copywriter unavailable",
            description: "Landing page copy is blocked until a new writer is found.",
            severity: Severity::High,
        }],
    },
    ProjectDef {
        title: "Half marathon",
        description: "Train for the autumn half marathon.",
        category: Category::Training,
        status: ProjectStatus::Active,
        priority: Priority::Medium,
        progress: 30,
        started_days_ago: 60,
        target_in_days: Some(90),
        tags: &["running"],
        milestones: &[
            MilestoneDef {
                title: "First 15 km run",
                offset_days: 20,
                completed: false,
            },
            MilestoneDef {
                title: "Race day",
                offset_days: 90,
                completed: false,
            },
        ],
        red_flags: &[RedFlagDef {
            title: "Knee pain",
            description: "Reduce weekly volume until it settles.",
            severity: Severity::Medium,
        }],
    },
    ProjectDef {
        title: "Debut EP",
        description: "Write, record and release four tracks.",
        category: Category::Music,
        status: ProjectStatus::Planning,
        priority: Priority::Critical,
        progress: 10,
        started_days_ago: 5,
        target_in_days: Some(180),
        tags: &["recording", "songwriting"],
        milestones: &[MilestoneDef {
            title: "Demo of all tracks",
            offset_days: 25,
            completed: false,
        }],
        red_flags: &[RedFlagDef {
            title: "Studio budget",
            description: "Quotes exceed the planned budget by 40%.",
            severity: Severity::Critical,
        }],
    },
    ProjectDef {
        title: "Rust course",
        description: "Finish the online course and its exercises.",
        category: Category::Learning,
        status: ProjectStatus::Completed,
        priority: Priority::Low,
        progress: 100,
        started_days_ago: 120,
        target_in_days: None,
        tags: &["programming"],
        milestones: &[],
        red_flags: &[],
    },
];

const DEMO_OBJECTIVES: &[ObjectiveDef] = &[
    ObjectiveDef {
        title: "Grow professionally",
        description: "Take on more ownership at work.",
        category: Category::Work,
        status: OkrStatus::OnTrack,
        quarter: "Q3",
        key_results: &[
            KeyResultDef {
                description: "Ship the website redesign",
                target: 100.0,
                current: 45.0,
                unit: "%",
                status: OkrStatus::OnTrack,
            },
            KeyResultDef {
                description: "Mentor junior colleagues",
                target: 2.0,
                current: 1.0,
                unit: "people",
                status: OkrStatus::OnTrack,
            },
        ],
    },
    ObjectiveDef {
        title: "Get fitter",
        description: "Build a consistent training habit.",
        category: Category::Training,
        status: OkrStatus::AtRisk,
        quarter: "Q3",
        key_results: &[
            KeyResultDef {
                description: "Run distance",
                target: 300.0,
                current: 80.0,
                unit: "km",
                status: OkrStatus::AtRisk,
            },
            KeyResultDef {
                description: "Strength sessions",
                target: 24.0,
                current: 6.0,
                unit: "sessions",
                status: OkrStatus::AtRisk,
            },
        ],
    },
];

const DEMO_INITIATIVES: &[InitiativeDef] = &[
    InitiativeDef {
        title: "Start a podcast",
        description: "Monthly conversations about music production.",
        category: Category::Music,
        status: InitiativeStatus::Idea,
        priority: Priority::Low,
        effort: Some(Level::High),
        impact: Some(Level::Medium),
        notes: "Needs a co-host.",
    },
    InitiativeDef {
        title: "Learn Spanish",
        description: "Reach conversational level.",
        category: Category::Learning,
        status: InitiativeStatus::Evaluating,
        priority: Priority::Medium,
        effort: Some(Level::Medium),
        impact: Some(Level::High),
        notes: "",
    },
    InitiativeDef {
        title: "Home office upgrade",
        description: "Standing desk and better lighting.",
        category: Category::Personal,
        status: InitiativeStatus::InProgress,
        priority: Priority::High,
        effort: Some(Level::Low),
        impact: Some(Level::Medium),
        notes: "",
    },
];

/// Ensures the demo account exists and, when it owns nothing yet, fills it
/// with a small sample portfolio. Returns the number of top-level entities
/// inserted.
pub async fn init_demo_account(store: &PortfolioStore) -> anyhow::Result<usize> {
    let user = match store.get_user_by_email(DEMO_EMAIL).await? {
        Some(user) => user,
        None => {
            let account = NewAccount {
                email: DEMO_EMAIL.to_string(),
                password: DEMO_PASSWORD.to_string(),
                name: Some(DEMO_NAME.to_string()),
            };
            let user = store
                .create_user(&account)
                .await?
                .ok_or_else(|| anyhow::anyhow!("demo account was created concurrently"))?;
            tracing::info!(email = DEMO_EMAIL, user_id = %user.id, "Created demo account");
            user
        }
    };
    let owner = user.id.as_str();

    let project_filter = ProjectFilter::default();
    let objective_filter = ObjectiveFilter::default();
    let initiative_filter = InitiativeFilter::default();
    let (projects, objectives, initiatives) = tokio::try_join!(
        store.list_projects(owner, &project_filter),
        store.list_objectives(owner, &objective_filter),
        store.list_initiatives(owner, &initiative_filter),
    )?;
    if !projects.is_empty() || !objectives.is_empty() || !initiatives.is_empty() {
        tracing::debug!(
            projects = projects.len(),
            objectives = objectives.len(),
            initiatives = initiatives.len(),
            "Demo account already has data, skipping sample portfolio"
        );
        return Ok(0);
    }

    let now = Utc::now();
    let mut inserted = 0usize;

    for def in DEMO_PROJECTS {
        let project = store
            .create_project(
                owner,
                &NewProject {
                    title: def.title.to_string(),
                    description: def.description.to_string(),
                    category: def.category,
                    status: def.status,
                    priority: def.priority,
                    progress: def.progress,
                    start_date: Some(now - Duration::days(def.started_days_ago)),
                    target_end_date: def.target_in_days.map(|d| now + Duration::days(d)),
                    actual_end_date: None,
                    tags: def.tags.iter().map(|t| t.to_string()).collect(),
                },
            )
            .await?;
        for m in def.milestones {
            let milestone = store
                .add_milestone(
                    owner,
                    &project.id,
                    &NewMilestone {
                        title: m.title.to_string(),
                        description: String::new(),
                        date: now + Duration::days(m.offset_days),
                        category: None,
                    },
                )
                .await?;
            if let (Some(milestone), true) = (milestone, m.completed) {
                store
                    .toggle_milestone(owner, &project.id, &milestone.id)
                    .await?;
            }
        }
        for f in def.red_flags {
            store
                .add_red_flag(
                    owner,
                    &project.id,
                    &NewRedFlag {
                        title: f.title.to_string(),
                        description: f.description.to_string(),
                        severity: f.severity,
                    },
                )
                .await?;
        }
        inserted += 1;
    }

    for def in DEMO_OBJECTIVES {
        store
            .create_objective(
                owner,
                &NewObjective {
                    title: def.title.to_string(),
                    description: def.description.to_string(),
                    category: def.category,
                    status: def.status,
                    progress: 0,
                    quarter: Some(def.quarter.to_string()),
                    target_date: None,
                    key_results: def
                        .key_results
                        .iter()
                        .map(|kr| NewKeyResult {
                            description: kr.description.to_string(),
                            target: kr.target,
                            current: kr.current,
                            unit: kr.unit.to_string(),
                            status: kr.status,
                        })
                        .collect(),
                },
            )
            .await?;
        inserted += 1;
    }

    for def in DEMO_INITIATIVES {
        store
            .create_initiative(
                owner,
                &NewInitiative {
                    title: def.title.to_string(),
                    description: def.description.to_string(),
                    category: def.category,
                    status: def.status,
                    priority: def.priority,
                    estimated_effort: def.effort,
                    potential_impact: def.impact,
                    notes: def.notes.to_string(),
                },
            )
            .await?;
        inserted += 1;
    }

    tracing::info!(
        inserted,
        projects = DEMO_PROJECTS.len(),
        objectives = DEMO_OBJECTIVES.len(),
        initiatives = DEMO_INITIATIVES.len(),
        "Demo portfolio initialized"
    );
    Ok(inserted)
}
