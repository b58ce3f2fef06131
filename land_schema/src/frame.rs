use std::hash::{BuildHasher, Hash, Hasher};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use crate::values::{Amount, Felt};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CellKind {
    Empty = 0,
    Auction = 1,
    Building = 2,
}

impl From<CellKind> for u8 {
    fn from(kind: CellKind) -> Self {
        kind as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AuctionState {
    pub start_time: u64,
    pub start_price: Amount,
    pub floor_price: Amount,
    pub decay_rate: u64,
    pub is_finished: bool,
    pub sold_at_price: Option<Amount>,
}

/// Flattened, render-ready view of one grid cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CellState {
    pub location: u32,
    pub x: u32,
    pub y: u32,
    pub kind: CellKind,
    pub version: u64,
    pub owner: Option<Felt>,
    pub level: u8,
    pub sell_price: Amount,
    pub token: Option<Felt>,
    pub staked_amount: Amount,
    pub last_pay_time: u64,
    pub bought_at: u64,
    pub auction: Option<AuctionState>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameHeader {
    pub grid_version: u64,
    pub side: u32,
    pub cell_count: u32,
    pub hash: u64,
}

impl FrameHeader {
    pub fn new(grid_version: u64, side: u32, cell_count: usize) -> Self {
        Self {
            grid_version,
            side,
            cell_count: cell_count as u32,
            hash: 0,
        }
    }
}

/// Every non-empty cell at one grid version.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridFrame {
    pub header: FrameHeader,
    pub cells: Vec<CellState>,
}

impl GridFrame {
    pub fn finalize(mut self) -> Self {
        self.header.hash = hash_cells(&self.header, &self.cells);
        self
    }
}

/// Cells (including ones that became empty) whose version advanced past
/// `since_version`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridDelta {
    pub header: FrameHeader,
    pub since_version: u64,
    pub cells: Vec<CellState>,
}

impl GridDelta {
    pub fn finalize(mut self) -> Self {
        self.header.hash = hash_cells(&self.header, &self.cells);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn hash_cells(header: &FrameHeader, cells: &[CellState]) -> u64 {
    let mut hasher = RandomState::with_seeds(0, 0, 0, 0).build_hasher();
    header.grid_version.hash(&mut hasher);
    header.side.hash(&mut hasher);
    header.cell_count.hash(&mut hasher);
    cells.hash(&mut hasher);
    hasher.finish()
}

pub fn encode_frame(frame: &GridFrame) -> bincode::Result<Vec<u8>> {
    bincode::serialize(frame)
}

pub fn decode_frame(bytes: &[u8]) -> bincode::Result<GridFrame> {
    bincode::deserialize(bytes)
}

pub fn encode_delta(delta: &GridDelta) -> bincode::Result<Vec<u8>> {
    bincode::serialize(delta)
}

pub fn decode_delta(bytes: &[u8]) -> bincode::Result<GridDelta> {
    bincode::deserialize(bytes)
}

pub fn encode_frame_json(frame: &GridFrame) -> serde_json::Result<String> {
    serde_json::to_string(frame)
}

pub fn decode_frame_json(data: &str) -> serde_json::Result<GridFrame> {
    serde_json::from_str(data)
}
