//! Integration tests for the User repository using in-memory SurrealDB.

use portal_core::error::PortalError;
use portal_core::models::user::{CreateUser, Role, UpdateUser};
use portal_core::repository::{Pagination, UserRepository};
use portal_db::repository::SurrealUserRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    portal_db::run_migrations(&db).await.unwrap();
    db
}

fn new_user(email: &str, role: Role) -> CreateUser {
    CreateUser {
        email: email.into(),
        full_name: "Alice Example".into(),
        password: "SuperSecret123!".into(),
        role,
        department: Some("Engineering".into()),
    }
}

#[tokio::test]
async fn create_and_get_user() {
    let repo = SurrealUserRepository::new(setup().await);

    let user = repo
        .create(new_user("alice@company.com", Role::Hr))
        .await
        .unwrap();

    assert_eq!(user.email, "alice@company.com");
    assert_eq!(user.role, Role::Hr);
    assert_eq!(user.department.as_deref(), Some("Engineering"));
    assert!(user.is_active);

    // Password should be hashed, not stored in plaintext.
    assert_ne!(user.password_hash, "SuperSecret123!");
    assert!(user.password_hash.starts_with("$argon2id$"));

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.full_name, "Alice Example");
}

#[tokio::test]
async fn email_lookup_is_case_insensitive() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("Bob@Company.com", Role::Employee))
        .await
        .unwrap();
    assert_eq!(user.email, "bob@company.com");

    let fetched = repo.get_by_email("BOB@company.com").await.unwrap();
    assert_eq!(fetched.id, user.id);
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let repo = SurrealUserRepository::new(setup().await);
    repo.create(new_user("carol@company.com", Role::Employee))
        .await
        .unwrap();

    let err = repo
        .create(new_user("carol@company.com", Role::Admin))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Conflict { .. }), "{err:?}");
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let repo = SurrealUserRepository::new(setup().await);
    assert!(matches!(
        repo.get_by_id(uuid::Uuid::new_v4()).await,
        Err(PortalError::NotFound { .. })
    ));
    assert!(matches!(
        repo.get_by_email("nobody@company.com").await,
        Err(PortalError::NotFound { .. })
    ));
}

#[tokio::test]
async fn update_changes_role_and_deactivates() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("dave@company.com", Role::Employee))
        .await
        .unwrap();

    let updated = repo
        .update(
            user.id,
            UpdateUser {
                role: Some(Role::InventoryManager),
                is_active: Some(false),
                department: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.role, Role::InventoryManager);
    assert!(!updated.is_active);
    assert!(updated.department.is_none());
    assert_eq!(updated.password_hash, user.password_hash);
}

#[tokio::test]
async fn update_rehashes_password() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("erin@company.com", Role::Employee))
        .await
        .unwrap();

    let updated = repo
        .update(
            user.id,
            UpdateUser {
                password: Some("AnotherSecret456!".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_ne!(updated.password_hash, user.password_hash);
    assert!(updated.password_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn list_users_paginates() {
    let repo = SurrealUserRepository::new(setup().await);
    for i in 0..3 {
        repo.create(new_user(&format!("user{i}@company.com"), Role::Employee))
            .await
            .unwrap();
    }

    let page = repo
        .list(Pagination {
            offset: 0,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);

    let rest = repo
        .list(Pagination {
            offset: 2,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
}
