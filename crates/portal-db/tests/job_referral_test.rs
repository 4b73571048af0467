//! Integration tests for the JobPosting and Referral repositories.

use portal_core::error::PortalError;
use portal_core::models::job::{CreateJobPosting, JobStatus, UpdateJobPosting};
use portal_core::models::referral::{CreateReferral, ReferralFilter, ReferralStatus, UpdateReferral};
use portal_core::repository::{JobRepository, Pagination, ReferralRepository};
use portal_db::repository::{SurrealJobRepository, SurrealReferralRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> (SurrealJobRepository<Db>, SurrealReferralRepository<Db>) {
    let db: Surreal<Db> = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    portal_db::run_migrations(&db).await.unwrap();
    (
        SurrealJobRepository::new(db.clone()),
        SurrealReferralRepository::new(db),
    )
}

fn job(title: &str, status: JobStatus) -> CreateJobPosting {
    CreateJobPosting {
        title: title.into(),
        department: "Engineering".into(),
        experience_range: Some("3-5".into()),
        required_skills: vec!["Rust".into(), "SQL".into()],
        status,
        employment_type: Some("FTE".into()),
        is_budgeted: true,
        description_text: Some("Build things.".into()),
        created_by: Uuid::new_v4(),
    }
}

fn referral(job_id: Uuid, referred_by: Uuid, name: &str) -> CreateReferral {
    CreateReferral {
        job_id,
        referred_by,
        candidate_name: name.into(),
        candidate_email: format!("{}@example.com", name.to_lowercase()),
        candidate_phone: None,
        department: None,
        experience: Some("4 years".into()),
        skills: vec!["Rust".into()],
        about_candidate: None,
    }
}

#[tokio::test]
async fn create_get_and_update_job() {
    let (jobs, _) = setup().await;
    let created = jobs.create(job("Backend Engineer", JobStatus::Open)).await.unwrap();
    assert_eq!(created.required_skills, vec!["Rust", "SQL"]);
    assert!(created.description_locator.is_none());

    let updated = jobs
        .update(
            created.id,
            UpdateJobPosting {
                status: Some(JobStatus::OnHold),
                description_locator: Some("job_description/abc.pdf".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, JobStatus::OnHold);
    assert_eq!(updated.title, "Backend Engineer");
    assert_eq!(
        updated.description_locator.as_deref(),
        Some("job_description/abc.pdf")
    );
}

#[tokio::test]
async fn list_jobs_filters_by_status() {
    let (jobs, _) = setup().await;
    jobs.create(job("A", JobStatus::Open)).await.unwrap();
    jobs.create(job("B", JobStatus::Closed)).await.unwrap();
    jobs.create(job("C", JobStatus::Open)).await.unwrap();

    let all = jobs.list(None, Pagination::default()).await.unwrap();
    assert_eq!(all.total, 3);

    let open = jobs
        .list(Some(JobStatus::Open), Pagination::default())
        .await
        .unwrap();
    assert_eq!(open.total, 2);
    assert!(open.items.iter().all(|j| j.status == JobStatus::Open));
}

#[tokio::test]
async fn job_with_referrals_cannot_be_deleted() {
    let (jobs, referrals) = setup().await;
    let posting = jobs.create(job("QA", JobStatus::Open)).await.unwrap();
    let r = referrals
        .create(referral(posting.id, Uuid::new_v4(), "Jane"))
        .await
        .unwrap();

    let err = jobs.delete(posting.id).await.unwrap_err();
    assert!(matches!(err, PortalError::Conflict { .. }));

    referrals.delete(r.id).await.unwrap();
    jobs.delete(posting.id).await.unwrap();
    assert!(matches!(
        jobs.get_by_id(posting.id).await,
        Err(PortalError::NotFound { .. })
    ));
}

#[tokio::test]
async fn referral_defaults_and_review() {
    let (jobs, referrals) = setup().await;
    let posting = jobs.create(job("SRE", JobStatus::Open)).await.unwrap();
    let referrer = Uuid::new_v4();

    let created = referrals
        .create(referral(posting.id, referrer, "Sam"))
        .await
        .unwrap();
    assert_eq!(created.status, ReferralStatus::Submitted);
    assert_eq!(created.referred_by, referrer);
    assert!(created.resume_locator.is_none());

    let reviewed = referrals
        .update(
            created.id,
            UpdateReferral {
                status: Some(ReferralStatus::Interviewing),
                notes: Some("Strong systems background".into()),
                resume_locator: Some("resume/sam.pdf".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(reviewed.status, ReferralStatus::Interviewing);
    assert_eq!(reviewed.notes.as_deref(), Some("Strong systems background"));
    assert_eq!(reviewed.resume_locator.as_deref(), Some("resume/sam.pdf"));
}

#[tokio::test]
async fn list_referrals_by_referrer_and_count_by_job() {
    let (jobs, referrals) = setup().await;
    let first = jobs.create(job("One", JobStatus::Open)).await.unwrap();
    let second = jobs.create(job("Two", JobStatus::Open)).await.unwrap();
    let me = Uuid::new_v4();
    let someone_else = Uuid::new_v4();

    referrals.create(referral(first.id, me, "A")).await.unwrap();
    referrals.create(referral(second.id, me, "B")).await.unwrap();
    referrals
        .create(referral(first.id, someone_else, "C"))
        .await
        .unwrap();

    let mine = referrals
        .list(
            ReferralFilter {
                referred_by: Some(me),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(mine.total, 2);
    assert!(mine.items.iter().all(|r| r.referred_by == me));

    let for_first = referrals
        .list(
            ReferralFilter {
                job_id: Some(first.id),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(for_first.total, 2);

    assert_eq!(referrals.count_by_job(first.id).await.unwrap(), 2);
    assert_eq!(referrals.count_by_job(second.id).await.unwrap(), 1);
    assert_eq!(referrals.count_by_job(Uuid::new_v4()).await.unwrap(), 0);
}
