//! Data contracts shared by the land grid crates.
//!
//! Holds the inbound indexer record shape, the ledger scalar codecs and the
//! outbound projection frames. No reconciliation logic lives here.

pub mod entity;
pub mod frame;
pub mod values;

pub use entity::{fields, EntityUpdate, FieldMap, ModelKind};
pub use frame::{
    decode_delta, decode_frame, decode_frame_json, encode_delta, encode_frame, encode_frame_json,
    AuctionState, CellKind, CellState, FrameHeader, GridDelta, GridFrame,
};
pub use values::{bool_from_value, u128_from_value, u64_from_value, Amount, Felt, ValueError};
