//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations live in
//! `portal-db`; the traits keep the services free of any storage
//! dependency.

use uuid::Uuid;

use crate::error::PortalResult;
use crate::lifecycle::Transition;
use crate::models::{
    asset::{Asset, AssetFilter, AssetHistory, AssetSnapshot, CreateAsset, UpdateAsset},
    job::{CreateJobPosting, JobPosting, JobStatus, UpdateJobPosting},
    referral::{CreateReferral, Referral, ReferralFilter, UpdateReferral},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    fn create(&self, input: CreateUser) -> impl Future<Output = PortalResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PortalResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = PortalResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = PortalResult<User>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = PortalResult<PaginatedResult<User>>> + Send;
}

// ---------------------------------------------------------------------------
// Recruiting
// ---------------------------------------------------------------------------

pub trait JobRepository: Send + Sync {
    fn create(
        &self,
        input: CreateJobPosting,
    ) -> impl Future<Output = PortalResult<JobPosting>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PortalResult<JobPosting>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateJobPosting,
    ) -> impl Future<Output = PortalResult<JobPosting>> + Send;
    /// Fails with `Conflict` while referrals still point at the job.
    fn delete(&self, id: Uuid) -> impl Future<Output = PortalResult<()>> + Send;
    fn list(
        &self,
        status: Option<JobStatus>,
        pagination: Pagination,
    ) -> impl Future<Output = PortalResult<PaginatedResult<JobPosting>>> + Send;
}

pub trait ReferralRepository: Send + Sync {
    fn create(&self, input: CreateReferral)
    -> impl Future<Output = PortalResult<Referral>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PortalResult<Referral>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateReferral,
    ) -> impl Future<Output = PortalResult<Referral>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = PortalResult<()>> + Send;
    fn list(
        &self,
        filter: ReferralFilter,
        pagination: Pagination,
    ) -> impl Future<Output = PortalResult<PaginatedResult<Referral>>> + Send;
    fn count_by_job(&self, job_id: Uuid) -> impl Future<Output = PortalResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Record store for assets and their assignment history.
///
/// Writes that change an existing asset are guarded by the version the
/// caller read; a mismatch yields `ConcurrentModification` and no write.
pub trait AssetRepository: Send + Sync {
    /// New assets start `available`. Duplicate serial numbers or MAC ids
    /// fail with `Conflict`.
    fn create(&self, input: CreateAsset) -> impl Future<Output = PortalResult<Asset>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PortalResult<Asset>> + Send;
    fn list(
        &self,
        filter: AssetFilter,
        pagination: Pagination,
    ) -> impl Future<Output = PortalResult<PaginatedResult<Asset>>> + Send;
    fn update_details(
        &self,
        id: Uuid,
        expected_version: u64,
        input: UpdateAsset,
    ) -> impl Future<Output = PortalResult<Asset>> + Send;

    /// Read an asset with intent to update, together with its open
    /// history entry.
    fn snapshot(&self, id: Uuid) -> impl Future<Output = PortalResult<AssetSnapshot>> + Send;

    /// Atomically persist a planned transition: every field of the asset
    /// row plus the history entries it closes and opens. All or nothing.
    /// Returns the asset as written by the transition.
    fn apply_transition(
        &self,
        transition: &Transition,
    ) -> impl Future<Output = PortalResult<Asset>> + Send;

    /// Full history of an asset, oldest first.
    fn history(&self, id: Uuid) -> impl Future<Output = PortalResult<Vec<AssetHistory>>> + Send;
}
