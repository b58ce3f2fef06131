//! Incoming yield: the taxes a land's live neighbors pay into it.

use land_schema::Amount;
use serde::Serialize;

use crate::config::GameConfig;
use crate::grid::CellSource;
use crate::location::Location;
use crate::neighbors::live_neighbors;
use crate::taxes::tax_per_neighbor;
use crate::tokens::TokenRef;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborYield {
    pub location: Location,
    #[serde(serialize_with = "serialize_token")]
    pub token: Option<TokenRef>,
    pub sell_price: Amount,
    /// Percent of the neighbor's listed price flowing in per tax period.
    pub percent_rate: f64,
    pub per_hour: Amount,
}

impl NeighborYield {
    fn vacant(location: Location) -> Self {
        Self {
            location,
            token: None,
            sell_price: Amount::ZERO,
            percent_rate: 0.0,
            per_hour: Amount::ZERO,
        }
    }

    pub fn is_vacant(&self) -> bool {
        self.percent_rate == 0.0
    }
}

fn serialize_token<S: serde::Serializer>(
    token: &Option<TokenRef>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match token {
        Some(token) => serializer.serialize_some(token.symbol()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenYield {
    pub token: TokenRef,
    pub per_hour: Amount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YieldSummary {
    pub location: Location,
    pub occupied_slots: usize,
    pub max_slots: u32,
    pub neighbors: Vec<NeighborYield>,
    /// Per-token totals, in ledger neighbor order of first appearance.
    pub per_token: Vec<TokenYield>,
}

impl YieldSummary {
    /// Share of the theoretical maximum yield currently collected.
    pub fn occupancy(&self) -> f64 {
        self.occupied_slots as f64 / f64::from(self.max_slots)
    }
}

fn neighbor_yield(
    location: Location,
    sell_price: Amount,
    token: Option<TokenRef>,
    config: &GameConfig,
) -> NeighborYield {
    let per_period = tax_per_neighbor(sell_price, config);
    let per_hour = per_period * 3600.0 / config.tax_period_seconds as f64;
    NeighborYield {
        location,
        token,
        sell_price,
        percent_rate: config.tax_rate_percent as f64 * config.game_speed as f64
            / f64::from(config.max_neighbors),
        per_hour: Amount::from_f64(per_hour),
    }
}

/// Each live neighbor fills one of `max_neighbors` slots and pays
/// `1 / max_neighbors` of the maximum tax on its own listed price.
pub fn aggregate_yield<S: CellSource + ?Sized>(
    location: Location,
    source: &S,
    config: &GameConfig,
) -> YieldSummary {
    let neighbors: Vec<NeighborYield> = live_neighbors(location, source)
        .iter()
        .map(|cell| neighbor_yield(cell.location(), cell.sell_price(), cell.token().cloned(), config))
        .collect();

    let mut per_token: Vec<TokenYield> = Vec::new();
    for entry in &neighbors {
        let Some(token) = &entry.token else {
            continue;
        };
        match per_token
            .iter_mut()
            .find(|existing| existing.token.address() == token.address())
        {
            Some(existing) => existing.per_hour = existing.per_hour.saturating_add(entry.per_hour),
            None => per_token.push(TokenYield {
                token: token.clone(),
                per_hour: entry.per_hour,
            }),
        }
    }

    YieldSummary {
        location,
        occupied_slots: neighbors.len(),
        max_slots: config.max_neighbors,
        neighbors,
        per_token,
    }
}

/// The 3x3 block centered on `location`, clipped to the grid and sorted by
/// location. Slots without a live neighbor, the center included, are
/// zero-filled.
pub fn neighbor_yield_grid<S: CellSource + ?Sized>(
    location: Location,
    source: &S,
    config: &GameConfig,
) -> Vec<NeighborYield> {
    let side = source.side();
    if !location.in_bounds(side) {
        return Vec::new();
    }
    let summary = aggregate_yield(location, source, config);
    let (x, y) = location.coordinates(side);

    let mut block = Vec::with_capacity(9);
    for ny in y.saturating_sub(1)..=(y + 1).min(side - 1) {
        for nx in x.saturating_sub(1)..=(x + 1).min(side - 1) {
            let slot = Location::from_xy(nx, ny, side);
            let entry = summary
                .neighbors
                .iter()
                .find(|neighbor| neighbor.location == slot && slot != location)
                .cloned()
                .unwrap_or_else(|| NeighborYield::vacant(slot));
            block.push(entry);
        }
    }
    block.sort_by_key(|entry| entry.location);
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::LandGrid;
    use crate::tokens::TokenTable;
    use land_schema::{fields, EntityUpdate, ModelKind};
    use serde_json::json;
    use std::sync::Arc;

    fn grid() -> LandGrid {
        LandGrid::new(
            Arc::new(GameConfig::default().with_grid_size(4)),
            TokenTable::builtin(),
        )
    }

    fn place(grid: &LandGrid, location: u32, price: u64, token: &str) {
        grid.apply(&EntityUpdate::new(format!("e{location}")).with_model(
            "ponzi_land",
            ModelKind::Land,
            fields(json!({
                "location": location,
                "owner": "0xabc",
                "block_date_bought": 1,
                "sell_price": price,
                "token_used": token,
                "level": "Zero",
            })),
        ));
    }

    #[test]
    fn yield_is_split_per_token() {
        let grid = grid();
        let lords = "0x05735fa6be5dd248350866644c0a137e571f9d637bb4db6532ddd63a95854b58";
        place(&grid, 5, 1_000, lords);
        place(&grid, 0, 1_000, lords);
        place(&grid, 1, 2_000, lords);
        place(&grid, 2, 1_000, "0x99");

        let summary = aggregate_yield(Location(5), &grid, grid.config());
        assert_eq!(summary.occupied_slots, 3);
        assert!((summary.occupancy() - 3.0 / 8.0).abs() < 1e-9);
        // 1000 * 0.02 * 20 / 8 = 50 per hour per 1000 listed.
        assert_eq!(summary.per_token.len(), 2);
        assert_eq!(summary.per_token[0].per_hour, Amount(150));
        assert_eq!(summary.per_token[1].token.symbol(), "???");
        assert!((summary.neighbors[0].percent_rate - 5.0).abs() < 1e-9);
    }

    #[test]
    fn block_is_zero_filled_and_clipped() {
        let grid = grid();
        place(&grid, 1, 1_000, "0x7");

        let block = neighbor_yield_grid(Location(0), &grid, grid.config());
        let locations: Vec<u32> = block.iter().map(|entry| entry.location.0).collect();
        assert_eq!(locations, vec![0, 1, 4, 5]);
        assert!(block[0].is_vacant());
        assert_eq!(block[1].per_hour, Amount(50));
        assert!(block[2].is_vacant() && block[3].is_vacant());

        assert_eq!(neighbor_yield_grid(Location(5), &grid, grid.config()).len(), 9);
    }
}
