//! Asset lifecycle: the state machine behind assignment, release and
//! retirement.
//!
//! ```text
//! available --assign--> assigned --release--> available
//!     |                     |
//!     +------retire---------+-----retire----> retired (terminal)
//! ```
//!
//! Every assignment opens exactly one history entry and every release
//! closes it, so an asset is `assigned` if and only if it has exactly one
//! open history entry.
//!
//! The module has two layers:
//! - `plan_*` functions are pure. Given a snapshot and a request they
//!   return the [`Transition`] to persist, or the reason it is illegal.
//! - [`AssetLifecycle`] loads a snapshot, plans, and hands the transition
//!   to the repository as one versioned write. When another writer got
//!   there first it re-reads and re-plans, so the loser of a race sees the
//!   new state and gets a `Conflict`.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{PortalError, PortalResult};
use crate::models::asset::{
    Asset, AssetFilter, AssetHistory, AssetSnapshot, AssetStatus, Assignee, CreateAsset,
    CurrentAssignment, PreviousAssignment, UpdateAsset,
};
use crate::repository::{AssetRepository, PaginatedResult, Pagination};

/// Attempts made before a lost optimistic-lock race is reported as a
/// conflict.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A history entry to open as part of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub sequence: u32,
    pub assignee: Assignee,
    pub assigned_date: DateTime<Utc>,
}

/// The open history entry to close as part of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedEntry {
    pub entry_id: Uuid,
    pub returned_date: DateTime<Utc>,
    /// Full notes after closing (existing notes plus the release notes).
    pub notes: Option<String>,
}

/// A planned change to one asset and its history.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Version the plan was computed from. The write must fail if the
    /// stored asset has moved on.
    pub expected_version: u64,
    /// The asset as it should look afterwards (the store bumps `version`).
    pub asset: Asset,
    pub close: Option<ClosedEntry>,
    pub open: Option<NewHistoryEntry>,
}

/// A requested status change, mapped onto the matching `plan_*` function.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    Assign(Assignee, DateTime<Utc>),
    Release(DateTime<Utc>, Option<String>),
    Retire(Option<String>),
}

impl StatusChange {
    pub fn operation(&self) -> &'static str {
        match self {
            StatusChange::Assign(..) => "assign",
            StatusChange::Release(..) => "release",
            StatusChange::Retire(_) => "retire",
        }
    }

    /// `now` is only used as the implicit return date when retiring an
    /// assigned asset.
    pub fn plan(&self, snapshot: &AssetSnapshot, now: DateTime<Utc>) -> PortalResult<Transition> {
        match self {
            StatusChange::Assign(assignee, assigned_date) => {
                plan_assign(snapshot, assignee.clone(), *assigned_date)
            }
            StatusChange::Release(returned_date, notes) => {
                plan_release(snapshot, *returned_date, notes.as_deref())
            }
            StatusChange::Retire(notes) => plan_retire(snapshot, notes.as_deref(), now),
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Plan handing an available asset to `assignee`.
pub fn plan_assign(
    snapshot: &AssetSnapshot,
    assignee: Assignee,
    assigned_date: DateTime<Utc>,
) -> PortalResult<Transition> {
    assignee.validate()?;

    let asset = &snapshot.asset;
    if asset.status != AssetStatus::Available {
        return Err(PortalError::conflict(format!(
            "asset {} is {}; only available assets can be assigned",
            asset.serial_number, asset.status
        )));
    }
    if let Some(open) = &snapshot.open_entry {
        return Err(inconsistent(
            asset,
            format!(
                "history entry {} is still open while the asset is available",
                open.id
            ),
        ));
    }

    let mut next = asset.clone();
    if let Some(stale) = next.current.take() {
        next.previous = Some(PreviousAssignment {
            name: stale.assignee.name,
            user_id: stale.assignee.user_id,
            date: stale.assigned_date,
        });
    }
    next.current = Some(CurrentAssignment {
        assignee: assignee.clone(),
        assigned_date,
    });
    next.status = AssetStatus::Assigned;
    next.assignment_count = asset.assignment_count + 1;

    Ok(Transition {
        expected_version: asset.version,
        open: Some(NewHistoryEntry {
            id: Uuid::new_v4(),
            asset_id: asset.id,
            sequence: next.assignment_count,
            assignee,
            assigned_date,
        }),
        close: None,
        asset: next,
    })
}

/// Plan ending the current assignment of an assigned asset.
pub fn plan_release(
    snapshot: &AssetSnapshot,
    returned_date: DateTime<Utc>,
    notes: Option<&str>,
) -> PortalResult<Transition> {
    let asset = &snapshot.asset;
    if asset.status != AssetStatus::Assigned {
        return Err(PortalError::conflict(format!(
            "asset {} is {}; only assigned assets can be released",
            asset.serial_number, asset.status
        )));
    }
    let open = snapshot
        .open_entry
        .as_ref()
        .ok_or_else(|| inconsistent(asset, "asset is assigned but has no open history entry"))?;
    let current = asset
        .current
        .as_ref()
        .ok_or_else(|| inconsistent(asset, "asset is assigned but has no current assignee"))?;
    if current.assignee.user_id != open.assignee.user_id {
        return Err(inconsistent(
            asset,
            format!(
                "current assignee {} does not match open history entry {} ({})",
                current.assignee.user_id, open.id, open.assignee.user_id
            ),
        ));
    }
    if returned_date < open.assigned_date {
        return Err(PortalError::validation(format!(
            "returned date {} precedes assigned date {}",
            returned_date.to_rfc3339(),
            open.assigned_date.to_rfc3339()
        )));
    }

    let mut next = asset.clone();
    next.previous = Some(PreviousAssignment {
        name: current.assignee.name.clone(),
        user_id: current.assignee.user_id.clone(),
        date: returned_date,
    });
    next.current = None;
    next.status = AssetStatus::Available;

    Ok(Transition {
        expected_version: asset.version,
        asset: next,
        close: Some(ClosedEntry {
            entry_id: open.id,
            returned_date,
            notes: append_notes(open.notes.as_deref(), notes),
        }),
        open: None,
    })
}

/// Plan retiring an asset. An assigned asset is released at `now` first,
/// so a retired asset never holds an open history entry.
pub fn plan_retire(
    snapshot: &AssetSnapshot,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> PortalResult<Transition> {
    let asset = &snapshot.asset;
    let mut transition = match asset.status {
        AssetStatus::Retired => {
            return Err(PortalError::conflict(format!(
                "asset {} is already retired",
                asset.serial_number
            )));
        }
        AssetStatus::Assigned => {
            // Never close an entry before it opened, even with clock skew.
            let returned = snapshot
                .open_entry
                .as_ref()
                .map_or(now, |open| now.max(open.assigned_date));
            plan_release(snapshot, returned, notes)?
        }
        AssetStatus::Available => {
            if let Some(open) = &snapshot.open_entry {
                return Err(inconsistent(
                    asset,
                    format!(
                        "history entry {} is still open while the asset is available",
                        open.id
                    ),
                ));
            }
            Transition {
                expected_version: asset.version,
                asset: asset.clone(),
                close: None,
                open: None,
            }
        }
    };

    transition.asset.status = AssetStatus::Retired;
    transition.asset.notes = append_notes(asset.notes.as_deref(), notes);
    Ok(transition)
}

/// Join existing notes and new notes with a newline, ignoring blanks.
pub fn append_notes(existing: Option<&str>, extra: Option<&str>) -> Option<String> {
    let existing = existing.map(str::trim).filter(|s| !s.is_empty());
    let extra = extra.map(str::trim).filter(|s| !s.is_empty());
    match (existing, extra) {
        (Some(a), Some(b)) => Some(format!("{a}\n{b}")),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}

fn inconsistent(asset: &Asset, detail: impl Into<String>) -> PortalError {
    let detail = detail.into();
    error!(
        asset_id = %asset.id,
        serial_number = %asset.serial_number,
        status = %asset.status,
        detail = %detail,
        "Asset state is inconsistent with its history"
    );
    PortalError::InvalidState {
        message: format!("asset {}: {detail}", asset.serial_number),
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Single entry point for every asset operation.
///
/// Generic over the repository so that the lifecycle has no dependency on
/// the database crate.
pub struct AssetLifecycle<R: AssetRepository> {
    repo: R,
    max_attempts: u32,
}

impl<R: AssetRepository> AssetLifecycle<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub async fn create(&self, input: CreateAsset) -> PortalResult<Asset> {
        input.validate()?;
        let asset = self.repo.create(input).await?;
        info!(asset_id = %asset.id, serial_number = %asset.serial_number, "Asset created");
        Ok(asset)
    }

    pub async fn get(&self, id: Uuid) -> PortalResult<Asset> {
        self.repo.get_by_id(id).await
    }

    pub async fn list(
        &self,
        filter: AssetFilter,
        pagination: Pagination,
    ) -> PortalResult<PaginatedResult<Asset>> {
        self.repo.list(filter, pagination).await
    }

    /// Update descriptive fields. Status and assignment slots are not
    /// reachable from here.
    pub async fn update_details(&self, id: Uuid, input: UpdateAsset) -> PortalResult<Asset> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let asset = self.repo.get_by_id(id).await?;
            if input.is_empty() {
                return Ok(asset);
            }
            input.validate_against(&asset)?;
            match self
                .repo
                .update_details(id, asset.version, input.clone())
                .await
            {
                Err(PortalError::ConcurrentModification { .. }) if attempt < self.max_attempts => {
                    warn!(asset_id = %id, attempt, "Asset changed during update, retrying");
                }
                other => return other.map_err(|e| lost_race(e, id)),
            }
        }
    }

    pub async fn assign(
        &self,
        id: Uuid,
        assignee: Assignee,
        assigned_date: DateTime<Utc>,
    ) -> PortalResult<Asset> {
        let change = StatusChange::Assign(assignee, assigned_date);
        self.change(id, change, UpdateAsset::default()).await
    }

    pub async fn release(
        &self,
        id: Uuid,
        returned_date: DateTime<Utc>,
        notes: Option<String>,
    ) -> PortalResult<Asset> {
        let change = StatusChange::Release(returned_date, notes);
        self.change(id, change, UpdateAsset::default()).await
    }

    pub async fn retire(&self, id: Uuid, notes: Option<String>) -> PortalResult<Asset> {
        self.retire_at(id, notes, Utc::now()).await
    }

    /// [`Self::retire`] with an explicit clock for the implicit release.
    pub async fn retire_at(
        &self,
        id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> PortalResult<Asset> {
        self.change_at(id, StatusChange::Retire(notes), UpdateAsset::default(), now)
            .await
    }

    /// Apply a status change together with descriptive edits.
    pub async fn change(
        &self,
        id: Uuid,
        change: StatusChange,
        details: UpdateAsset,
    ) -> PortalResult<Asset> {
        self.change_at(id, change, details, Utc::now()).await
    }

    /// [`Self::change`] with an explicit clock. The edits are validated
    /// and applied to the snapshot before planning, and the result is
    /// persisted as a single transition: if any part is rejected nothing
    /// is written.
    pub async fn change_at(
        &self,
        id: Uuid,
        change: StatusChange,
        details: UpdateAsset,
        now: DateTime<Utc>,
    ) -> PortalResult<Asset> {
        self.transition(id, change.operation(), |snapshot| {
            if details.is_empty() {
                return change.plan(snapshot, now);
            }
            details.validate_against(&snapshot.asset)?;
            let mut edited = snapshot.clone();
            details.apply_to(&mut edited.asset);
            change.plan(&edited, now)
        })
        .await
    }

    /// Assignment history, oldest first, including the open entry.
    pub async fn history(&self, id: Uuid) -> PortalResult<Vec<AssetHistory>> {
        self.repo.history(id).await
    }

    async fn transition<F>(&self, id: Uuid, operation: &'static str, plan: F) -> PortalResult<Asset>
    where
        F: Fn(&AssetSnapshot) -> PortalResult<Transition> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let snapshot = self.repo.snapshot(id).await?;
            let transition = plan(&snapshot)?;
            match self.repo.apply_transition(&transition).await {
                Ok(asset) => {
                    info!(
                        asset_id = %id,
                        operation,
                        status = %asset.status,
                        version = asset.version,
                        "Asset transition applied"
                    );
                    return Ok(asset);
                }
                Err(PortalError::ConcurrentModification { .. }) if attempt < self.max_attempts => {
                    warn!(asset_id = %id, operation, attempt, "Asset changed concurrently, re-planning");
                }
                Err(e) => return Err(lost_race(e, id)),
            }
        }
    }
}

/// A race that survives every retry is reported as a plain conflict.
fn lost_race(err: PortalError, id: Uuid) -> PortalError {
    match err {
        PortalError::ConcurrentModification { .. } => PortalError::conflict(format!(
            "asset {id} was modified concurrently; retry the request"
        )),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::models::asset::AssetCategory;

    // -- In-memory repository -------------------------------------------

    #[derive(Default)]
    struct State {
        assets: HashMap<Uuid, Asset>,
        history: Vec<AssetHistory>,
    }

    #[derive(Default)]
    struct MemoryAssets {
        state: Mutex<State>,
        /// Number of upcoming `apply_transition` calls that should lose a
        /// race against `interloper`.
        races_to_lose: AtomicU32,
        interloper: Option<Assignee>,
    }

    impl MemoryAssets {
        fn open_entries(&self, asset_id: Uuid) -> usize {
            let state = self.state.lock().unwrap();
            state
                .history
                .iter()
                .filter(|h| h.asset_id == asset_id && h.is_open())
                .count()
        }

        fn snapshot_sync(&self, id: Uuid) -> PortalResult<AssetSnapshot> {
            let state = self.state.lock().unwrap();
            let asset = state
                .assets
                .get(&id)
                .cloned()
                .ok_or_else(|| PortalError::not_found("asset", id))?;
            let open_entry = state
                .history
                .iter()
                .find(|h| h.asset_id == id && h.is_open())
                .cloned();
            Ok(AssetSnapshot { asset, open_entry })
        }

        fn apply_sync(&self, t: &Transition) -> PortalResult<Asset> {
            let mut state = self.state.lock().unwrap();
            let stored = state
                .assets
                .get(&t.asset.id)
                .ok_or_else(|| PortalError::not_found("asset", t.asset.id))?;
            if stored.version != t.expected_version {
                return Err(PortalError::ConcurrentModification {
                    entity: "asset".into(),
                    id: t.asset.id.to_string(),
                });
            }
            let mut asset = t.asset.clone();
            asset.version = t.expected_version + 1;
            asset.updated_at = Utc::now();
            if let Some(close) = &t.close {
                let entry = state
                    .history
                    .iter_mut()
                    .find(|h| h.id == close.entry_id)
                    .expect("closed entry exists");
                entry.returned_date = Some(close.returned_date);
                entry.notes = close.notes.clone();
            }
            if let Some(open) = &t.open {
                state.history.push(AssetHistory {
                    id: open.id,
                    asset_id: open.asset_id,
                    sequence: open.sequence,
                    assignee: open.assignee.clone(),
                    assigned_date: open.assigned_date,
                    returned_date: None,
                    notes: None,
                    created_at: Utc::now(),
                });
            }
            state.assets.insert(asset.id, asset.clone());
            Ok(asset)
        }
    }

    impl AssetRepository for MemoryAssets {
        async fn create(&self, input: CreateAsset) -> PortalResult<Asset> {
            let now = Utc::now();
            let asset = Asset {
                id: Uuid::new_v4(),
                serial_number: input.serial_number,
                category: input.category,
                charger_number: input.charger_number,
                mac_id: input.mac_id,
                external_mouse: input.external_mouse,
                headphones: input.headphones,
                mouse_pad: input.mouse_pad,
                status: AssetStatus::Available,
                current: None,
                previous: None,
                notes: input.notes,
                procurement_date: input.procurement_date,
                warranty_expiry: input.warranty_expiry,
                assignment_count: 0,
                version: 0,
                created_at: now,
                updated_at: now,
            };
            let mut state = self.state.lock().unwrap();
            if state
                .assets
                .values()
                .any(|a| a.serial_number == asset.serial_number)
            {
                return Err(PortalError::conflict("duplicate serial number"));
            }
            state.assets.insert(asset.id, asset.clone());
            Ok(asset)
        }

        async fn get_by_id(&self, id: Uuid) -> PortalResult<Asset> {
            self.snapshot_sync(id).map(|s| s.asset)
        }

        async fn list(
            &self,
            _filter: AssetFilter,
            pagination: Pagination,
        ) -> PortalResult<PaginatedResult<Asset>> {
            let state = self.state.lock().unwrap();
            let items: Vec<Asset> = state.assets.values().cloned().collect();
            Ok(PaginatedResult {
                total: items.len() as u64,
                items,
                offset: pagination.offset,
                limit: pagination.limit,
            })
        }

        async fn update_details(
            &self,
            id: Uuid,
            expected_version: u64,
            input: UpdateAsset,
        ) -> PortalResult<Asset> {
            let mut state = self.state.lock().unwrap();
            let asset = state
                .assets
                .get_mut(&id)
                .ok_or_else(|| PortalError::not_found("asset", id))?;
            if asset.version != expected_version {
                return Err(PortalError::ConcurrentModification {
                    entity: "asset".into(),
                    id: id.to_string(),
                });
            }
            if let Some(notes) = input.notes {
                asset.notes = Some(notes);
            }
            if let Some(d) = input.procurement_date {
                asset.procurement_date = Some(d);
            }
            asset.version += 1;
            Ok(asset.clone())
        }

        async fn snapshot(&self, id: Uuid) -> PortalResult<AssetSnapshot> {
            self.snapshot_sync(id)
        }

        async fn apply_transition(&self, transition: &Transition) -> PortalResult<Asset> {
            let lose = self
                .races_to_lose
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if lose {
                // Another writer assigns the asset between our read and
                // our write.
                let assignee = self.interloper.clone().expect("interloper configured");
                let snapshot = self.snapshot_sync(transition.asset.id)?;
                let theirs = plan_assign(&snapshot, assignee, Utc::now())?;
                self.apply_sync(&theirs)?;
            }
            self.apply_sync(transition)
        }

        async fn history(&self, id: Uuid) -> PortalResult<Vec<AssetHistory>> {
            let state = self.state.lock().unwrap();
            if !state.assets.contains_key(&id) {
                return Err(PortalError::not_found("asset", id));
            }
            let mut entries: Vec<AssetHistory> = state
                .history
                .iter()
                .filter(|h| h.asset_id == id)
                .cloned()
                .collect();
            entries.sort_by_key(|h| h.sequence);
            Ok(entries)
        }
    }

    // -- Helpers ----------------------------------------------------------

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 9, 0, 0).unwrap()
    }

    fn jane() -> Assignee {
        Assignee::new("Jane", "42", "jane@company.com")
    }

    fn person(name: &str) -> Assignee {
        Assignee::new(name, format!("id-{name}"), format!("{}@company.com", name.to_lowercase()))
    }

    async fn lifecycle_with_asset(serial: &str) -> (AssetLifecycle<MemoryAssets>, Uuid) {
        lifecycle_with_repo(MemoryAssets::default(), serial).await
    }

    async fn lifecycle_with_repo(
        repo: MemoryAssets,
        serial: &str,
    ) -> (AssetLifecycle<MemoryAssets>, Uuid) {
        let lifecycle = AssetLifecycle::new(repo);
        let asset = lifecycle
            .create(CreateAsset {
                serial_number: serial.into(),
                category: AssetCategory::Laptop,
                ..Default::default()
            })
            .await
            .unwrap();
        (lifecycle, asset.id)
    }

    fn assert_status_matches_history(lifecycle: &AssetLifecycle<MemoryAssets>, asset: &Asset) {
        let open = lifecycle.repository().open_entries(asset.id);
        if asset.status == AssetStatus::Assigned {
            assert_eq!(open, 1, "assigned asset must have exactly one open entry");
        } else {
            assert_eq!(open, 0, "{} asset must have no open entry", asset.status);
        }
    }

    // -- Pure planning ------------------------------------------------------

    #[test]
    fn append_notes_joins_non_blank_parts() {
        assert_eq!(append_notes(None, None), None);
        assert_eq!(append_notes(Some("a"), None).as_deref(), Some("a"));
        assert_eq!(append_notes(None, Some(" b ")).as_deref(), Some("b"));
        assert_eq!(append_notes(Some("a"), Some("b")).as_deref(), Some("a\nb"));
        assert_eq!(append_notes(Some("  "), Some("")), None);
    }

    #[tokio::test]
    async fn plan_assign_opens_entry_with_next_sequence() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-1").await;
        let snapshot = lifecycle.repository().snapshot_sync(id).unwrap();

        let t = plan_assign(&snapshot, jane(), day(1)).unwrap();
        assert_eq!(t.expected_version, 0);
        assert_eq!(t.asset.status, AssetStatus::Assigned);
        assert_eq!(t.asset.assignment_count, 1);
        assert!(t.close.is_none());
        let open = t.open.unwrap();
        assert_eq!(open.sequence, 1);
        assert_eq!(open.assignee, jane());
        assert_eq!(open.assigned_date, day(1));
    }

    #[tokio::test]
    async fn plan_assign_rejects_open_entry_on_available_asset() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-2").await;
        let mut snapshot = lifecycle.repository().snapshot_sync(id).unwrap();
        snapshot.open_entry = Some(AssetHistory {
            id: Uuid::new_v4(),
            asset_id: id,
            sequence: 1,
            assignee: jane(),
            assigned_date: day(1),
            returned_date: None,
            notes: None,
            created_at: Utc::now(),
        });

        let err = plan_assign(&snapshot, person("Bob"), day(2)).unwrap_err();
        assert!(matches!(err, PortalError::InvalidState { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn plan_assign_validates_assignee() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-3").await;
        let snapshot = lifecycle.repository().snapshot_sync(id).unwrap();
        let err = plan_assign(&snapshot, Assignee::new("Jane", "42", "jane"), day(1)).unwrap_err();
        assert!(matches!(err, PortalError::Validation { .. }));
    }

    // -- Driver scenarios ---------------------------------------------------

    #[tokio::test]
    async fn assign_then_release_round_trip() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-2024-099").await;

        let assigned = lifecycle.assign(id, jane(), day(1)).await.unwrap();
        assert_eq!(assigned.status, AssetStatus::Assigned);
        assert_eq!(assigned.version, 1);
        assert_status_matches_history(&lifecycle, &assigned);

        let released = lifecycle
            .release(id, day(5), Some("returned in good condition".into()))
            .await
            .unwrap();
        assert_eq!(released.status, AssetStatus::Available);
        assert!(released.current.is_none());
        assert_status_matches_history(&lifecycle, &released);

        let history = lifecycle.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].returned_date, Some(day(5)));
        assert_eq!(
            history[0].notes.as_deref(),
            Some("returned in good condition")
        );
    }

    #[tokio::test]
    async fn reassignment_scenario() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-A").await;
        let x = person("X");
        let y = person("Y");

        let asset = lifecycle.assign(id, x.clone(), day(1)).await.unwrap();
        assert_eq!(asset.status, AssetStatus::Assigned);
        assert_eq!(asset.current.as_ref().unwrap().assignee.name, "X");
        assert_eq!(lifecycle.history(id).await.unwrap().len(), 1);

        let err = lifecycle.assign(id, y.clone(), day(2)).await.unwrap_err();
        match err {
            PortalError::Conflict { message } => assert!(message.contains("assigned")),
            other => panic!("expected conflict, got {other:?}"),
        }
        let unchanged = lifecycle.get(id).await.unwrap();
        assert_eq!(unchanged, asset);

        let asset = lifecycle.release(id, day(3), None).await.unwrap();
        assert_eq!(asset.status, AssetStatus::Available);
        let previous = asset.previous.as_ref().unwrap();
        assert_eq!(previous.name, "X");
        assert_eq!(previous.date, day(3));
        let history = lifecycle.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].is_open());

        let asset = lifecycle.assign(id, y, day(4)).await.unwrap();
        assert_eq!(asset.status, AssetStatus::Assigned);
        assert_eq!(asset.previous.as_ref().unwrap().name, "X");
        let history = lifecycle.history(id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_open());
        assert!(history[1].is_open());
        assert_eq!(history[1].sequence, 2);
        assert_eq!(history[1].assignee.name, "Y");
        assert_status_matches_history(&lifecycle, &asset);
    }

    #[tokio::test]
    async fn release_requires_assigned_status() {
        let (lifecycle, id) = lifecycle_with_asset("MON-1").await;
        let err = lifecycle.release(id, day(1), None).await.unwrap_err();
        assert!(matches!(err, PortalError::Conflict { .. }));
        assert_eq!(lifecycle.get(id).await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn release_before_assignment_date_rejected() {
        let (lifecycle, id) = lifecycle_with_asset("MON-2").await;
        lifecycle.assign(id, jane(), day(10)).await.unwrap();
        let err = lifecycle.release(id, day(9), None).await.unwrap_err();
        assert!(matches!(err, PortalError::Validation { .. }));
        assert_eq!(lifecycle.repository().open_entries(id), 1);
    }

    #[tokio::test]
    async fn retire_assigned_asset_closes_history_first() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-R").await;
        lifecycle.assign(id, jane(), day(1)).await.unwrap();

        let retired = lifecycle
            .retire_at(id, Some("screen cracked".into()), day(20))
            .await
            .unwrap();
        assert_eq!(retired.status, AssetStatus::Retired);
        assert!(retired.current.is_none());
        assert_eq!(retired.previous.as_ref().unwrap().date, day(20));
        assert_eq!(retired.notes.as_deref(), Some("screen cracked"));
        assert_status_matches_history(&lifecycle, &retired);

        let history = lifecycle.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].returned_date, Some(day(20)));
    }

    #[tokio::test]
    async fn retire_uses_assignment_date_when_clock_is_behind() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-SKEW").await;
        lifecycle.assign(id, jane(), day(15)).await.unwrap();
        lifecycle.retire_at(id, None, day(14)).await.unwrap();
        let history = lifecycle.history(id).await.unwrap();
        assert_eq!(history[0].returned_date, Some(day(15)));
    }

    #[tokio::test]
    async fn retired_is_terminal() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-T").await;
        lifecycle.retire(id, None).await.unwrap();

        assert!(matches!(
            lifecycle.retire(id, None).await,
            Err(PortalError::Conflict { .. })
        ));
        assert!(matches!(
            lifecycle.assign(id, jane(), day(1)).await,
            Err(PortalError::Conflict { .. })
        ));
        assert!(matches!(
            lifecycle.release(id, day(1), None).await,
            Err(PortalError::Conflict { .. })
        ));
        assert!(lifecycle.history(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_asset_is_not_found() {
        let lifecycle = AssetLifecycle::new(MemoryAssets::default());
        let id = Uuid::new_v4();
        assert!(matches!(
            lifecycle.assign(id, jane(), day(1)).await,
            Err(PortalError::NotFound { .. })
        ));
        assert!(matches!(
            lifecycle.history(id).await,
            Err(PortalError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn same_person_may_hold_several_assets() {
        let repo = MemoryAssets::default();
        let (lifecycle, first) = lifecycle_with_repo(repo, "LPT-M1").await;
        let second = lifecycle
            .create(CreateAsset {
                serial_number: "MON-M2".into(),
                category: AssetCategory::Monitor,
                ..Default::default()
            })
            .await
            .unwrap()
            .id;

        lifecycle.assign(first, jane(), day(1)).await.unwrap();
        lifecycle.assign(second, jane(), day(1)).await.unwrap();
    }

    #[tokio::test]
    async fn lost_race_is_replanned_and_reported_as_conflict() {
        let repo = MemoryAssets {
            races_to_lose: AtomicU32::new(1),
            interloper: Some(person("Other")),
            ..Default::default()
        };
        let (lifecycle, id) = lifecycle_with_repo(repo, "LPT-RACE").await;

        let err = lifecycle.assign(id, jane(), day(1)).await.unwrap_err();
        assert!(matches!(err, PortalError::Conflict { .. }), "{err:?}");

        let asset = lifecycle.get(id).await.unwrap();
        assert_eq!(asset.current.unwrap().assignee.name, "Other");
        assert_eq!(lifecycle.history(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_details_keeps_lifecycle_fields() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-U").await;
        lifecycle.assign(id, jane(), day(1)).await.unwrap();

        let updated = lifecycle
            .update_details(
                id,
                UpdateAsset {
                    notes: Some("new battery".into()),
                    procurement_date: Some(day(1) - Duration::days(30)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, AssetStatus::Assigned);
        assert_eq!(updated.notes.as_deref(), Some("new battery"));
        assert_eq!(updated.version, 2);

        let err = lifecycle
            .update_details(
                id,
                UpdateAsset {
                    procurement_date: Some(day(2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Conflict { .. }));
    }

    #[tokio::test]
    async fn change_applies_status_and_details_together() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-C1").await;

        let asset = lifecycle
            .change(
                id,
                StatusChange::Assign(jane(), day(1)),
                UpdateAsset {
                    headphones: Some("HP-7".into()),
                    procurement_date: Some(day(1) - Duration::days(10)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(asset.status, AssetStatus::Assigned);
        assert_eq!(asset.headphones.as_deref(), Some("HP-7"));
        assert_eq!(asset.procurement_date, Some(day(1) - Duration::days(10)));
        assert_eq!(asset.version, 1, "one write for both parts");
        assert_status_matches_history(&lifecycle, &asset);
    }

    #[tokio::test]
    async fn rejected_details_leave_asset_and_history_untouched() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-C2").await;
        lifecycle
            .update_details(
                id,
                UpdateAsset {
                    procurement_date: Some(day(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let before = lifecycle.get(id).await.unwrap();

        let err = lifecycle
            .change(
                id,
                StatusChange::Assign(jane(), day(2)),
                UpdateAsset {
                    procurement_date: Some(day(3)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Conflict { .. }), "{err:?}");

        let after = lifecycle.get(id).await.unwrap();
        assert_eq!(after.status, AssetStatus::Available);
        assert_eq!(after.version, before.version);
        assert!(lifecycle.history(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retire_notes_follow_edited_notes() {
        let (lifecycle, id) = lifecycle_with_asset("LPT-C3").await;

        let asset = lifecycle
            .change_at(
                id,
                StatusChange::Retire(Some("screen cracked".into())),
                UpdateAsset {
                    notes: Some("MacBook Pro 16".into()),
                    ..Default::default()
                },
                day(4),
            )
            .await
            .unwrap();
        assert_eq!(asset.status, AssetStatus::Retired);
        assert_eq!(asset.notes.as_deref(), Some("MacBook Pro 16\nscreen cracked"));
    }
}
