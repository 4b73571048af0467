//! SurrealDB implementation of [`UserRepository`].
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash. An optional pepper (server-side secret) can be
//! provided at construction time.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use portal_core::error::{PortalError, PortalResult};
use portal_core::models::user::{CreateUser, Role, UpdateUser, User};
use portal_core::repository::{PaginatedResult, Pagination, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::CountRow;
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    email: String,
    full_name: String,
    password_hash: String,
    role: String,
    department: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<Role, DbError> {
    match s {
        "Admin" => Ok(Role::Admin),
        "Hr" => Ok(Role::Hr),
        "HiringManager" => Ok(Role::HiringManager),
        "Employee" => Ok(Role::Employee),
        "InventoryManager" => Ok(Role::InventoryManager),
        other => Err(DbError::corrupt("user", format!("unknown role: {other}"))),
    }
}

pub(crate) fn role_to_string(r: &Role) -> &'static str {
    match r {
        Role::Admin => "Admin",
        Role::Hr => "Hr",
        Role::HiringManager => "HiringManager",
        Role::Employee => "Employee",
        Role::InventoryManager => "InventoryManager",
    }
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::corrupt("user", format!("invalid UUID: {e}")))?;
        Ok(User {
            id,
            email: self.email,
            full_name: self.full_name,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            department: self.department,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Hash a password with Argon2id using OWASP-recommended parameters.
///
/// If a pepper is provided, it is prepended to the password before
/// hashing.
fn hash_password(password: &str, pepper: Option<&str>) -> PortalResult<String> {
    // m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| PortalError::Crypto(format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| PortalError::Crypto(format!("password hash: {e}")))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    async fn fetch_one(
        &self,
        query: &str,
        key: &'static str,
        value: String,
    ) -> PortalResult<User> {
        let mut result = self
            .db
            .query(query)
            .bind((key, value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", format!("{key}={value}")))?;

        Ok(row.try_into_user()?)
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> PortalResult<User> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, full_name = $full_name, \
                 password_hash = $password_hash, role = $role, \
                 department = $department, is_active = true",
            )
            .bind(("id", id.to_string()))
            .bind(("email", input.email.trim().to_lowercase()))
            .bind(("full_name", input.full_name))
            .bind(("password_hash", password_hash))
            .bind(("role", role_to_string(&input.role).to_string()))
            .bind(("department", input.department))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::from_write("user", e))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> PortalResult<User> {
        self.fetch_one(
            "SELECT meta::id(id) AS record_id, * FROM type::record('user', $id)",
            "id",
            id.to_string(),
        )
        .await
    }

    async fn get_by_email(&self, email: &str) -> PortalResult<User> {
        self.fetch_one(
            "SELECT meta::id(id) AS record_id, * FROM user WHERE email = $email",
            "email",
            email.trim().to_lowercase(),
        )
        .await
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> PortalResult<User> {
        // UPDATE on a missing record is a silent no-op.
        self.get_by_id(id).await?;

        let mut sets = Vec::new();
        if input.full_name.is_some() {
            sets.push("full_name = $full_name");
        }
        if input.department.is_some() {
            sets.push("department = $department");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.password.is_some() {
            sets.push("password_hash = $password_hash");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(full_name) = input.full_name {
            builder = builder.bind(("full_name", full_name));
        }
        if let Some(department) = input.department {
            // Some(None) clears the department.
            builder = builder.bind(("department", department));
        }
        if let Some(ref role) = input.role {
            builder = builder.bind(("role", role_to_string(role).to_string()));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(ref password) = input.password {
            let hash = hash_password(password, self.pepper.as_deref())?;
            builder = builder.bind(("password_hash", hash));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write("user", e))?;

        self.get_by_id(id).await
    }

    async fn list(&self, pagination: Pagination) -> PortalResult<PaginatedResult<User>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM user GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
