//! Read-only exports of the grid for renderers: flattened frames, deltas
//! since a version and a plain-text map.

use land_schema::{AuctionState, CellKind, CellState, FrameHeader, GridDelta, GridFrame};

use crate::cell::{LandCell, LandState};
use crate::grid::{CellView, GridSnapshot};

pub fn cell_state(view: &CellView, side: u32) -> CellState {
    let cell: &LandCell = &view.cell;
    let (x, y) = cell.location().coordinates(side);
    let mut state = CellState {
        location: cell.location().0,
        x,
        y,
        kind: cell.kind(),
        version: view.version,
        owner: cell.owner(),
        level: cell.level().map(|level| level.display_level()).unwrap_or(0),
        sell_price: cell.sell_price(),
        token: cell.token().map(|token| token.address()),
        staked_amount: Default::default(),
        last_pay_time: 0,
        bought_at: 0,
        auction: None,
    };
    match cell.state() {
        LandState::Empty => {}
        LandState::Building(building) => {
            state.staked_amount = building.stake.amount;
            state.last_pay_time = building.stake.last_pay_time;
            state.bought_at = building.bought_at;
        }
        LandState::Auction(auction) => {
            state.bought_at = auction.bought_at;
            state.auction = Some(AuctionState {
                start_time: auction.start_time,
                start_price: auction.start_price,
                floor_price: auction.floor_price,
                decay_rate: auction.decay_rate,
                is_finished: auction.is_finished,
                sold_at_price: auction.sold_at_price,
            });
        }
    }
    state
}

/// Every non-empty cell, ordered by location.
pub fn frame(snapshot: &GridSnapshot, side: u32) -> GridFrame {
    let cells: Vec<CellState> = snapshot
        .views()
        .filter(|view| !view.is_empty())
        .map(|view| cell_state(view, side))
        .collect();
    GridFrame {
        header: FrameHeader::new(snapshot.version(), side, cells.len()),
        cells,
    }
    .finalize()
}

/// Cells changed after `since_version`, including ones that became empty.
pub fn delta_since(snapshot: &GridSnapshot, side: u32, since_version: u64) -> GridDelta {
    let cells: Vec<CellState> = snapshot
        .views()
        .filter(|view| view.version > since_version)
        .map(|view| cell_state(view, side))
        .collect();
    GridDelta {
        header: FrameHeader::new(snapshot.version(), side, cells.len()),
        since_version,
        cells,
    }
    .finalize()
}

/// One character per cell: `.` empty, `A` auction, `1`-`3` building level.
pub fn render_ascii(snapshot: &GridSnapshot, side: u32) -> String {
    let mut out = String::with_capacity(snapshot.len() + side as usize);
    for (index, cell) in snapshot.cells().enumerate() {
        out.push(glyph(cell));
        if (index as u32 + 1) % side == 0 {
            out.push('\n');
        }
    }
    out
}

fn glyph(cell: &LandCell) -> char {
    match (cell.kind(), cell.level()) {
        (CellKind::Empty, _) => '.',
        (CellKind::Auction, _) => 'A',
        (CellKind::Building, Some(level)) => char::from(b'0' + level.display_level()),
        (CellKind::Building, None) => '?',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::grid::LandGrid;
    use crate::tokens::TokenTable;
    use land_schema::{decode_delta, encode_delta, fields, EntityUpdate, FieldMap, ModelKind};
    use serde_json::json;
    use std::sync::Arc;

    const NS: &str = "ponzi_land";

    fn populated() -> LandGrid {
        let grid = LandGrid::new(
            Arc::new(GameConfig::default().with_grid_size(4)),
            TokenTable::builtin(),
        );
        for (location, level) in [(0u32, "Zero"), (5, "First"), (15, "Second")] {
            grid.apply(&EntityUpdate::new(format!("l{location}")).with_model(
                NS,
                ModelKind::Land,
                fields(json!({
                    "location": location,
                    "owner": "0xabc",
                    "block_date_bought": 1,
                    "sell_price": 10,
                    "token_used": "0x7",
                    "level": level,
                })),
            ));
        }
        grid.apply(&EntityUpdate::new("a6").with_model(
            NS,
            ModelKind::Auction,
            fields(json!({
                "land_location": 6,
                "start_time": 1,
                "start_price": 100,
                "floor_price": 10,
                "decay_rate": 0,
                "is_finished": false,
            })),
        ));
        grid
    }

    #[test]
    fn ascii_map() {
        let grid = populated();
        insta::assert_snapshot!(render_ascii(&grid.snapshot(), 4), @r###"
        1...
        .2A.
        ....
        ...3
        "###);
    }

    #[test]
    fn frame_lists_occupied_cells() {
        let grid = populated();
        let frame = frame(&grid.snapshot(), 4);
        assert_eq!(frame.header.grid_version, 4);
        assert_eq!(frame.header.cell_count, 4);
        let kinds: Vec<CellKind> = frame.cells.iter().map(|cell| cell.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CellKind::Building,
                CellKind::Building,
                CellKind::Auction,
                CellKind::Building
            ]
        );
        assert_eq!(frame.cells[2].auction.as_ref().map(|a| a.start_price.raw()), Some(100));
    }

    #[test]
    fn delta_includes_cleared_cells() {
        let grid = populated();
        let before = grid.version();
        grid.apply(&EntityUpdate::new("l5").with_model(NS, ModelKind::Land, FieldMap::new()));

        let delta = delta_since(&grid.snapshot(), 4, before);
        assert_eq!(delta.cells.len(), 1);
        assert_eq!(delta.cells[0].location, 5);
        assert_eq!(delta.cells[0].kind, CellKind::Empty);

        let bytes = encode_delta(&delta).unwrap();
        assert_eq!(decode_delta(&bytes).unwrap(), delta);
        assert!(delta_since(&grid.snapshot(), 4, grid.version()).is_empty());
    }
}
