//! Land grid reconciliation and economy engine.
//!
//! Folds the indexer's partially ordered entity updates into a consistent
//! per-cell view of the grid ([`LandGrid::apply`]) and derives the
//! time-dependent economics of a land from that view and its neighbors.

pub mod auction;
pub mod cell;
pub mod config;
pub mod event;
pub mod grid;
pub mod ingest;
pub mod level;
pub mod location;
pub mod neighbors;
mod pending;
pub mod projection;
pub mod taxes;
pub mod tokens;
pub mod yields;

pub use auction::{current_auction_price, seconds_until_floor};
pub use cell::{AuctionLand, BuildingLand, LandCell, LandState, Level, Stake};
pub use config::{
    load_game_config_from_env, GameConfig, GameConfigError, GameConfigMetadata,
    BUILTIN_GAME_CONFIG, CONFIG_PATH_ENV,
};
pub use event::{
    decode_update, AuctionRecord, DecodeError, LandEvent, LandPayload, LandRecord, StakeRecord,
};
pub use grid::{
    ApplyOutcome, CellSource, CellView, DropReason, GridError, GridSnapshot, LandGrid,
    VersionBump, WatchScope,
};
pub use ingest::{
    bootstrap, read_updates_jsonl, spawn_feed, BootstrapReport, EntitySource, FeedHandle,
    IngestStats, SourceError, VecSource,
};
pub use level::{level_progress, LevelInfo};
pub use location::Location;
pub use neighbors::{live_neighbor_count, live_neighbors, neighbors_of, Direction, Neighborhood};
pub use projection::{cell_state, delta_since, frame, render_ascii};
pub use taxes::{
    accrued_tax, aggregate_taxes, estimate_next_claims, estimate_time_to_reclaim,
    reclaim_outlook, tax_per_neighbor, tax_per_period, AggregatedTaxes, ClaimInfo, PendingTax,
    ReclaimEstimate, ReclaimOutlook, TokenTax,
};
pub use tokens::{
    format_scaled, load_token_table_from_env, Token, TokenRef, TokenTable, TokenTableError,
    TOKENS_PATH_ENV,
};
pub use yields::{aggregate_yield, neighbor_yield_grid, NeighborYield, TokenYield, YieldSummary};
