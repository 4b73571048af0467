//! Demo data: one account per role, a few open jobs and some stock
//! assets. Running it twice creates nothing the second time.

use chrono::{DateTime, TimeZone, Utc};
use portal_core::error::{PortalError, PortalResult};
use portal_core::models::asset::{AssetCategory, CreateAsset};
use portal_core::models::job::{CreateJobPosting, JobStatus};
use portal_core::models::user::{CreateUser, Role, User};
use portal_core::repository::{JobRepository, Pagination, UserRepository};
use tracing::info;

use crate::state::AppState;

struct DemoUser {
    email: &'static str,
    full_name: &'static str,
    password: &'static str,
    role: Role,
    department: &'static str,
}

const DEMO_USERS: [DemoUser; 4] = [
    DemoUser {
        email: "admin@company.com",
        full_name: "Admin User",
        password: "admin123",
        role: Role::Admin,
        department: "IT",
    },
    DemoUser {
        email: "hr@company.com",
        full_name: "HR Manager",
        password: "hr123",
        role: Role::Hr,
        department: "Human Resources",
    },
    DemoUser {
        email: "employee@company.com",
        full_name: "John Employee",
        password: "employee123",
        role: Role::Employee,
        department: "Engineering",
    },
    DemoUser {
        email: "inventory@company.com",
        full_name: "Inventory Manager",
        password: "inventory123",
        role: Role::InventoryManager,
        department: "IT",
    },
];

/// What a seeding run created.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub jobs: usize,
    pub assets: usize,
}

fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Seed through the repositories directly. The demo passwords predate the
/// registration password policy, so they bypass it.
pub async fn seed(state: &AppState) -> PortalResult<SeedReport> {
    let mut report = SeedReport::default();
    let users = state.auth.users();

    let mut admin: Option<User> = None;
    for demo in &DEMO_USERS {
        let user = match users.get_by_email(demo.email).await {
            Ok(existing) => existing,
            Err(PortalError::NotFound { .. }) => {
                report.users += 1;
                users
                    .create(CreateUser {
                        email: demo.email.into(),
                        full_name: demo.full_name.into(),
                        password: demo.password.into(),
                        role: demo.role,
                        department: Some(demo.department.into()),
                    })
                    .await?
            }
            Err(e) => return Err(e),
        };
        if user.role == Role::Admin {
            admin = Some(user);
        }
    }
    let admin = admin.ok_or_else(|| PortalError::Internal("seeded admin missing".into()))?;

    let existing_jobs = state.jobs.list(None, Pagination::default()).await?;
    if existing_jobs.total == 0 {
        for (title, department, experience, skills, description) in [
            (
                "Senior Full Stack Developer",
                "Engineering",
                "5-7",
                &["React", "Node.js", "Python", "AWS"][..],
                "We are looking for an experienced Full Stack Developer...",
            ),
            (
                "DevOps Engineer",
                "Engineering",
                "3-5",
                &["Docker", "Kubernetes", "AWS", "CI/CD"][..],
                "Join our DevOps team to build and maintain infrastructure...",
            ),
            (
                "Product Manager",
                "Product",
                "4-6",
                &["Product Management", "Agile", "Stakeholder Management"][..],
                "Drive product strategy and roadmap...",
            ),
        ] {
            state
                .jobs
                .create(CreateJobPosting {
                    title: title.into(),
                    department: department.into(),
                    experience_range: Some(experience.into()),
                    required_skills: skills.iter().map(|s| s.to_string()).collect(),
                    status: JobStatus::Open,
                    employment_type: Some("FTE".into()),
                    is_budgeted: true,
                    description_text: Some(description.into()),
                    created_by: admin.id,
                })
                .await?;
            report.jobs += 1;
        }
    }

    for (serial, category, notes, procured, warranty) in [
        (
            "LPT-2024-001",
            AssetCategory::Laptop,
            "Apple MacBook Pro 16",
            day(2024, 1, 15),
            day(2027, 1, 15),
        ),
        (
            "LPT-2024-002",
            AssetCategory::Laptop,
            "Dell XPS 15",
            day(2024, 2, 10),
            day(2027, 2, 10),
        ),
        (
            "MON-2024-001",
            AssetCategory::Monitor,
            "Dell UltraSharp 27",
            day(2024, 1, 20),
            day(2027, 1, 20),
        ),
    ] {
        let created = state
            .assets
            .create(CreateAsset {
                serial_number: serial.into(),
                category,
                notes: Some(notes.into()),
                procurement_date: Some(procured),
                warranty_expiry: Some(warranty),
                ..Default::default()
            })
            .await;
        match created {
            Ok(_) => report.assets += 1,
            Err(PortalError::Conflict { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    info!(
        users = report.users,
        jobs = report.jobs,
        assets = report.assets,
        "Demo data seeded"
    );
    Ok(report)
}
