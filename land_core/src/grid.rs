//! Reconciliation store for the land grid.
//!
//! The grid owns one slot per location. Each slot holds an `Arc<LandCell>`
//! that the writer swaps wholesale, so a reader holding a view keeps a
//! consistent cell even while later updates land. Updates are serialized
//! through the writer lock; readers only ever take the per-slot read lock.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use land_schema::EntityUpdate;
use thiserror::Error;

use crate::cell::{LandCell, Stake};
use crate::config::GameConfig;
use crate::event::{decode_update, DecodeError, LandEvent, LandPayload};
use crate::location::Location;
use crate::pending::PendingStakes;
use crate::tokens::TokenTable;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell ({x}, {y}) is outside the {side}x{side} grid")]
    OutOfBounds { x: u32, y: u32, side: u32 },
    #[error("location {location} is outside the {side}x{side} grid")]
    LocationOutOfBounds { location: Location, side: u32 },
    #[error("payload for location {payload} applied to cell {cell}")]
    LocationMismatch { cell: Location, payload: Location },
}

/// Cell contents together with the grid version that last changed them.
#[derive(Debug, Clone)]
pub struct CellView {
    pub cell: Arc<LandCell>,
    pub version: u64,
}

impl std::ops::Deref for CellView {
    type Target = LandCell;

    fn deref(&self) -> &LandCell {
        &self.cell
    }
}

#[derive(Debug)]
struct CellSlot {
    view: RwLock<CellView>,
}

#[derive(Debug, Default)]
struct WriterState {
    pending: PendingStakes,
    /// Entity id to location, for deletion markers that carry no fields.
    entity_index: HashMap<String, Location>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchScope {
    Grid,
    Cell(Location),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionBump {
    pub location: Location,
    pub cell_version: u64,
    pub grid_version: u64,
}

#[derive(Debug)]
struct Subscriber {
    scope: WatchScope,
    sender: Sender<VersionBump>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Malformed(DecodeError),
    /// Deletion marker for an entity whose location was never seen.
    Unaddressable { entity_id: String },
    OutOfBounds { location: Location },
    LocationMismatch(GridError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Updated { location: Location, version: u64 },
    /// Only the pending-stake buffer changed.
    Buffered { location: Location },
    Unchanged,
    Dropped(DropReason),
}

impl ApplyOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, ApplyOutcome::Dropped(_))
    }
}

/// Read access shared by the live grid and its snapshots.
pub trait CellSource {
    fn side(&self) -> u32;

    fn land(&self, location: Location) -> Option<Arc<LandCell>>;
}

#[derive(Debug)]
enum PendingOp {
    Keep,
    Take,
    Store(Stake),
}

pub struct LandGrid {
    config: Arc<GameConfig>,
    tokens: Arc<TokenTable>,
    side: u32,
    slots: Vec<CellSlot>,
    writer: Mutex<WriterState>,
    version: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl LandGrid {
    pub fn new(config: Arc<GameConfig>, tokens: Arc<TokenTable>) -> Self {
        let side = config.grid_size;
        let slots = (0..config.cell_count() as u32)
            .map(|index| CellSlot {
                view: RwLock::new(CellView {
                    cell: Arc::new(LandCell::empty(Location(index))),
                    version: 0,
                }),
            })
            .collect();
        Self {
            config,
            tokens,
            side,
            slots,
            writer: Mutex::new(WriterState::default()),
            version: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_builtin() -> Self {
        LandGrid::new(GameConfig::builtin(), TokenTable::builtin())
    }

    pub fn config(&self) -> &Arc<GameConfig> {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<TokenTable> {
        &self.tokens
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Folds one indexer update into the grid. Safe to call again with an
    /// update that was already applied.
    pub fn apply(&self, update: &EntityUpdate) -> ApplyOutcome {
        let event = match decode_update(update, &self.config.namespace) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(
                    target: "ponziland::grid",
                    entity = %update.entity_id,
                    error = %err,
                    "land_event.dropped=malformed"
                );
                return ApplyOutcome::Dropped(DropReason::Malformed(err));
            }
        };
        self.apply_event(&event)
    }

    pub fn apply_event(&self, event: &LandEvent) -> ApplyOutcome {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let location = match event
            .location
            .or_else(|| writer.entity_index.get(&event.entity_id).copied())
        {
            Some(location) => location,
            None if event.is_noop() => return ApplyOutcome::Unchanged,
            None => {
                tracing::debug!(
                    target: "ponziland::grid",
                    entity = %event.entity_id,
                    "land_event.dropped=unaddressable"
                );
                return ApplyOutcome::Dropped(DropReason::Unaddressable {
                    entity_id: event.entity_id.clone(),
                });
            }
        };

        let Some(slot) = self.slots.get(location.index()) else {
            tracing::warn!(
                target: "ponziland::grid",
                location = %location,
                side = self.side,
                "land_event.dropped=out_of_bounds"
            );
            return ApplyOutcome::Dropped(DropReason::OutOfBounds { location });
        };

        if !event.entity_id.is_empty() {
            writer
                .entity_index
                .insert(event.entity_id.clone(), location);
        }

        let current = Arc::clone(&slot.view.read().unwrap_or_else(PoisonError::into_inner).cell);
        let (next, pending_op) = match merge(&current, event, &writer.pending, &self.tokens) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    target: "ponziland::grid",
                    location = %location,
                    error = %err,
                    "land_event.dropped=location_mismatch"
                );
                return ApplyOutcome::Dropped(DropReason::LocationMismatch(err));
            }
        };

        let buffered = match pending_op {
            PendingOp::Keep => false,
            PendingOp::Take => {
                writer.pending.take(location);
                false
            }
            PendingOp::Store(stake) => writer.pending.insert(location, stake) != Some(stake),
        };

        if next == *current {
            return if buffered {
                tracing::trace!(
                    target: "ponziland::grid",
                    location = %location,
                    "land_event.buffered=stake"
                );
                ApplyOutcome::Buffered { location }
            } else {
                ApplyOutcome::Unchanged
            };
        }

        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        let kind = next.kind();
        {
            let mut view = slot.view.write().unwrap_or_else(PoisonError::into_inner);
            *view = CellView {
                cell: Arc::new(next),
                version,
            };
        }
        tracing::trace!(
            target: "ponziland::grid",
            location = %location,
            kind = ?kind,
            version,
            "land_event.applied"
        );
        self.notify(VersionBump {
            location,
            cell_version: version,
            grid_version: version,
        });
        drop(writer);
        ApplyOutcome::Updated { location, version }
    }

    fn notify(&self, bump: VersionBump) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|subscriber| {
            let wants = match subscriber.scope {
                WatchScope::Grid => true,
                WatchScope::Cell(location) => location == bump.location,
            };
            !wants || subscriber.sender.send(bump).is_ok()
        });
    }

    /// Version bumps for the whole grid or one cell. Dropping the receiver
    /// unsubscribes on the next matching bump.
    pub fn subscribe(&self, scope: WatchScope) -> Receiver<VersionBump> {
        let (sender, receiver) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { scope, sender });
        receiver
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn cell(&self, x: u32, y: u32) -> Result<CellView, GridError> {
        if x >= self.side || y >= self.side {
            return Err(GridError::OutOfBounds {
                x,
                y,
                side: self.side,
            });
        }
        Ok(self.view_unchecked(Location::from_xy(x, y, self.side)))
    }

    /// Like [`LandGrid::cell`], for callers that have already bounds-checked.
    ///
    /// # Panics
    /// Panics when `(x, y)` lies outside the grid.
    pub fn cell_at(&self, x: u32, y: u32) -> CellView {
        match self.cell(x, y) {
            Ok(view) => view,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn cell_by_location(&self, location: Location) -> Result<CellView, GridError> {
        if !location.in_bounds(self.side) {
            return Err(GridError::LocationOutOfBounds {
                location,
                side: self.side,
            });
        }
        Ok(self.view_unchecked(location))
    }

    fn view_unchecked(&self, location: Location) -> CellView {
        self.slots[location.index()]
            .view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Point-in-time copy of every cell. Holds the writer lock while copying
    /// so the snapshot matches exactly one grid version.
    pub fn snapshot(&self) -> GridSnapshot {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let views = self
            .slots
            .iter()
            .map(|slot| slot.view.read().unwrap_or_else(PoisonError::into_inner).clone())
            .collect::<Vec<_>>();
        GridSnapshot {
            side: self.side,
            version: self.version(),
            views: views.into(),
        }
    }

    pub fn pending_stake(&self, location: Location) -> Option<Stake> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .peek(location)
    }

    /// Buffered stakes ordered by location.
    pub fn pending_stakes(&self) -> Vec<(Location, Stake)> {
        let mut stakes: Vec<_> = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .iter()
            .collect();
        stakes.sort_unstable_by_key(|(location, _)| *location);
        stakes
    }

    pub fn pending_count(&self) -> usize {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}

impl CellSource for LandGrid {
    fn side(&self) -> u32 {
        self.side
    }

    fn land(&self, location: Location) -> Option<Arc<LandCell>> {
        self.cell_by_location(location).ok().map(|view| view.cell)
    }
}

/// Immutable copy of the grid at one version. Cheap to clone and iterate
/// any number of times.
#[derive(Debug, Clone)]
pub struct GridSnapshot {
    side: u32,
    version: u64,
    views: Arc<[CellView]>,
}

impl GridSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn get(&self, location: Location) -> Option<&CellView> {
        self.views.get(location.index())
    }

    pub fn views(&self) -> impl Iterator<Item = &CellView> {
        self.views.iter()
    }

    pub fn cells(&self) -> impl Iterator<Item = &LandCell> {
        self.views.iter().map(|view| view.cell.as_ref())
    }

    pub fn occupied(&self) -> impl Iterator<Item = &LandCell> {
        self.cells().filter(|cell| !cell.is_empty())
    }
}

impl CellSource for GridSnapshot {
    fn side(&self) -> u32 {
        self.side
    }

    fn land(&self, location: Location) -> Option<Arc<LandCell>> {
        self.get(location).map(|view| Arc::clone(&view.cell))
    }
}

/// Merge rules, first match wins for the land and auction payloads; stakes
/// are folded in afterwards.
///
/// 1. A deletion empties the cell.
/// 2. An unfinished auction updates or creates the auction, absorbing any
///    land record from the same event. This also promotes an empty cell.
/// 3. A finished auction only refreshes an existing auction cell.
/// 4. A land record with a zero owner leaves an auction cell as it is; any
///    other land record updates or creates a building, which picks up a
///    buffered stake.
/// 5. A stake applies to a building, otherwise it is buffered.
fn merge(
    current: &LandCell,
    event: &LandEvent,
    pending: &PendingStakes,
    tokens: &TokenTable,
) -> Result<(LandCell, PendingOp), GridError> {
    let location = current.location();
    let mut next = current.clone();
    let mut op = PendingOp::Keep;

    if matches!(event.land, Some(LandPayload::Deleted)) {
        next.clear();
        return Ok((next, op));
    }

    let land = event.land_record();
    match &event.auction {
        Some(auction) if !auction.is_finished => {
            next.put_auction(auction, land, tokens)?;
        }
        auction => {
            if let Some(finished) = auction {
                if next.as_auction().is_some() {
                    next.put_auction(finished, None, tokens)?;
                }
            }
            if let Some(record) = land {
                let zero_owner_echo = next.as_auction().is_some() && record.owner.is_zero();
                if !zero_owner_echo {
                    let fresh = next.as_building().is_none();
                    next.put_building(record, tokens)?;
                    if fresh {
                        if let Some(stake) = pending.peek(location) {
                            next.put_stake(location, stake)?;
                            op = PendingOp::Take;
                        }
                    }
                }
            }
        }
    }

    if let Some(record) = &event.stake {
        if !next.put_stake(record.location, Stake::from(record))? {
            op = PendingOp::Store(Stake::from(record));
        }
    }

    Ok((next, op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use land_schema::{fields, Amount, Felt, FieldMap, ModelKind};
    use serde_json::json;

    const NS: &str = "ponzi_land";

    fn grid(side: u32) -> LandGrid {
        LandGrid::new(
            Arc::new(GameConfig::default().with_grid_size(side)),
            TokenTable::builtin(),
        )
    }

    fn land(location: u32, owner: &str) -> EntityUpdate {
        EntityUpdate::new(format!("land-{location}")).with_model(
            NS,
            ModelKind::Land,
            fields(json!({
                "location": location,
                "owner": owner,
                "block_date_bought": 50,
                "sell_price": 1000,
                "token_used": "0x7",
                "level": "Zero",
            })),
        )
    }

    fn stake(location: u32, amount: u64) -> EntityUpdate {
        EntityUpdate::new(format!("stake-{location}")).with_model(
            NS,
            ModelKind::LandStake,
            fields(json!({ "location": location, "amount": amount, "last_pay_time": 60 })),
        )
    }

    fn auction(location: u32, finished: bool) -> EntityUpdate {
        EntityUpdate::new(format!("auction-{location}")).with_model(
            NS,
            ModelKind::Auction,
            fields(json!({
                "land_location": location,
                "start_time": 10,
                "start_price": 2000,
                "floor_price": 1000,
                "decay_rate": 0,
                "is_finished": finished,
                "sold_at_price": { "None": [] },
            })),
        )
    }

    #[test]
    fn cells_start_empty() {
        let grid = grid(4);
        assert_eq!(grid.version(), 0);
        assert!(grid.snapshot().cells().all(LandCell::is_empty));
        assert_eq!(grid.snapshot().len(), 16);
    }

    #[test]
    fn out_of_bounds_access_is_an_error() {
        let grid = grid(4);
        assert_eq!(
            grid.cell(4, 0).unwrap_err(),
            GridError::OutOfBounds { x: 4, y: 0, side: 4 }
        );
        assert!(grid.cell(3, 3).is_ok());
    }

    #[test]
    #[should_panic(expected = "outside the 4x4 grid")]
    fn cell_at_fails_loudly() {
        grid(4).cell_at(0, 9);
    }

    #[test]
    fn buffered_stake_lands_on_new_building() {
        let grid = grid(4);
        assert!(matches!(grid.apply(&auction(0, false)), ApplyOutcome::Updated { .. }));
        assert_eq!(
            grid.apply(&stake(0, 500)),
            ApplyOutcome::Buffered {
                location: Location(0)
            }
        );
        assert_eq!(grid.pending_count(), 1);
        let buffered: Vec<Location> = grid
            .pending_stakes()
            .into_iter()
            .map(|(location, _)| location)
            .collect();
        assert_eq!(buffered, vec![Location(0)]);

        grid.apply(&land(0, "0xabc"));
        let view = grid.cell(0, 0).unwrap();
        assert_eq!(view.stake().map(|stake| stake.amount), Some(Amount(500)));
        assert_eq!(grid.pending_count(), 0);
        assert!(grid.pending_stakes().is_empty());
    }

    #[test]
    fn zero_owner_echo_keeps_auction() {
        let grid = grid(4);
        grid.apply(&auction(5, false));
        let before = grid.cell_by_location(Location(5)).unwrap();
        assert_eq!(grid.apply(&land(5, "0x0")), ApplyOutcome::Unchanged);
        let after = grid.cell_by_location(Location(5)).unwrap();
        assert_eq!(*before.cell, *after.cell);
        assert_eq!(before.version, after.version);
    }

    #[test]
    fn redelivery_does_not_bump_version() {
        let grid = grid(4);
        grid.apply(&land(3, "0xabc"));
        grid.apply(&stake(3, 10));
        let version = grid.version();
        assert_eq!(grid.apply(&land(3, "0xabc")), ApplyOutcome::Unchanged);
        assert_eq!(grid.apply(&stake(3, 10)), ApplyOutcome::Unchanged);
        assert_eq!(grid.version(), version);
    }

    #[test]
    fn deletion_by_entity_id_empties_cell() {
        let grid = grid(4);
        grid.apply(&land(7, "0xabc"));
        let marker = EntityUpdate::new("land-7").with_model(NS, ModelKind::Land, FieldMap::new());
        assert!(matches!(grid.apply(&marker), ApplyOutcome::Updated { .. }));
        assert!(grid.cell_by_location(Location(7)).unwrap().is_empty());

        let stranger = EntityUpdate::new("never-seen").with_model(NS, ModelKind::Land, FieldMap::new());
        assert!(matches!(
            grid.apply(&stranger),
            ApplyOutcome::Dropped(DropReason::Unaddressable { .. })
        ));
    }

    #[test]
    fn finished_auction_is_ignored_on_empty_cell() {
        let grid = grid(4);
        assert_eq!(grid.apply(&auction(2, true)), ApplyOutcome::Unchanged);
        assert!(grid.cell(2, 0).unwrap().is_empty());
    }

    #[test]
    fn malformed_and_out_of_range_events_are_dropped() {
        let grid = grid(4);
        let broken = EntityUpdate::new("x").with_model(
            NS,
            ModelKind::LandStake,
            fields(json!({ "location": 1 })),
        );
        assert!(grid.apply(&broken).is_dropped());
        assert_eq!(
            grid.apply(&land(16, "0xabc")),
            ApplyOutcome::Dropped(DropReason::OutOfBounds {
                location: Location(16)
            })
        );
        assert_eq!(grid.version(), 0);
    }

    #[test]
    fn subscribers_see_scoped_bumps() {
        let grid = grid(4);
        let whole = grid.subscribe(WatchScope::Grid);
        let single = grid.subscribe(WatchScope::Cell(Location(1)));

        grid.apply(&land(0, "0xabc"));
        grid.apply(&land(1, "0xdef"));

        let seen: Vec<_> = whole.try_iter().map(|bump| bump.location).collect();
        assert_eq!(seen, vec![Location(0), Location(1)]);
        let bump = single.try_recv().unwrap();
        assert_eq!(bump.location, Location(1));
        assert_eq!(bump.grid_version, 2);
        assert!(single.try_recv().is_err());
    }

    #[test]
    fn snapshot_is_point_in_time() {
        let grid = grid(4);
        grid.apply(&land(0, "0xabc"));
        let snapshot = grid.snapshot();
        grid.apply(&land(1, "0xdef"));

        assert_eq!(snapshot.version(), 1);
        assert_eq!(snapshot.occupied().count(), 1);
        assert_eq!(snapshot.occupied().count(), 1);
        assert_eq!(
            snapshot.land(Location(0)).and_then(|cell| cell.owner()),
            Some(Felt::from_u128(0xabc))
        );
    }
}
