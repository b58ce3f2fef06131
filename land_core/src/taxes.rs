//! Tax projections: what a building owes, when its stake runs out, and what
//! a land can collect from its neighbors.
//!
//! A building pays every live neighbor `price * tax_rate * game_speed /
//! max_neighbors` per tax period. Amounts are raw ledger integers; the
//! intermediate maths runs in `f64`.

use std::collections::HashMap;

use land_schema::{Amount, Felt};
use serde::Serialize;

use crate::cell::{BuildingLand, LandCell};
use crate::config::GameConfig;
use crate::grid::CellSource;
use crate::location::Location;
use crate::neighbors::{live_neighbor_count, neighbors_of};
use crate::tokens::{TokenRef, TokenTable};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ReclaimEstimate {
    /// Nothing drains the stake.
    Unbounded,
    Seconds(f64),
}

impl ReclaimEstimate {
    pub fn seconds(self) -> Option<f64> {
        match self {
            ReclaimEstimate::Unbounded => None,
            ReclaimEstimate::Seconds(seconds) => Some(seconds),
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, ReclaimEstimate::Unbounded)
    }
}

/// Tax paid to a single neighbor per tax period.
pub fn tax_per_neighbor(listed_price: Amount, config: &GameConfig) -> f64 {
    listed_price.as_f64() * config.tax_rate() * config.game_speed as f64
        / f64::from(config.max_neighbors)
}

/// Total tax paid per tax period with `live_neighbors` neighbors.
pub fn tax_per_period(listed_price: Amount, live_neighbors: usize, config: &GameConfig) -> f64 {
    tax_per_neighbor(listed_price, config) * live_neighbors as f64
}

/// Seconds until `staked_amount` is drained at the current neighbor count.
pub fn estimate_time_to_reclaim(
    listed_price: Amount,
    staked_amount: Amount,
    live_neighbors: usize,
    config: &GameConfig,
) -> ReclaimEstimate {
    let rate = tax_per_period(listed_price, live_neighbors, config);
    if live_neighbors == 0 || rate <= 0.0 {
        return ReclaimEstimate::Unbounded;
    }
    let periods = staked_amount.as_f64() / rate;
    ReclaimEstimate::Seconds(periods * config.tax_period_seconds as f64)
}

/// Tax accrued since the building last paid, capped at its stake.
pub fn accrued_tax(
    building: &BuildingLand,
    live_neighbors: usize,
    now: u64,
    config: &GameConfig,
) -> Amount {
    let elapsed = now.saturating_sub(building.stake.last_pay_time) as f64;
    let owed = tax_per_period(building.sell_price, live_neighbors, config) * elapsed
        / config.tax_period_seconds as f64;
    Amount::from_f64(owed).min(building.stake.amount)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReclaimOutlook {
    pub location: Location,
    pub live_neighbors: usize,
    /// Raw amount paid per tax period.
    pub tax_per_period: f64,
    pub accrued: Amount,
    pub remaining_stake: Amount,
    pub time_left: ReclaimEstimate,
    /// Unix time at which the stake is exhausted.
    pub reclaim_at: Option<u64>,
}

impl ReclaimOutlook {
    pub fn is_nukable(&self) -> bool {
        self.live_neighbors > 0 && self.remaining_stake.is_zero()
    }
}

/// Reclaim outlook for the building at `cell`; `None` for any other variant.
pub fn reclaim_outlook<S: CellSource + ?Sized>(
    cell: &LandCell,
    source: &S,
    now: u64,
    config: &GameConfig,
) -> Option<ReclaimOutlook> {
    let building = cell.as_building()?;
    let live = live_neighbor_count(cell.location(), source);
    let accrued = accrued_tax(building, live, now, config);
    let remaining_stake = building.stake.amount.saturating_sub(accrued);
    let time_left = estimate_time_to_reclaim(building.sell_price, remaining_stake, live, config);
    let reclaim_at = time_left
        .seconds()
        .map(|seconds| now.saturating_add(seconds.ceil() as u64));

    tracing::trace!(
        target: "ponziland::economics",
        location = %cell.location(),
        live,
        accrued = %accrued,
        remaining = %remaining_stake,
        "reclaim_outlook.computed"
    );

    Some(ReclaimOutlook {
        location: cell.location(),
        live_neighbors: live,
        tax_per_period: tax_per_period(building.sell_price, live, config),
        accrued,
        remaining_stake,
        time_left,
        reclaim_at,
    })
}

/// Tax a neighbor owes to the claiming land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimInfo {
    pub token: Felt,
    pub amount: Amount,
    pub land_location: Location,
    pub can_be_nuked: bool,
}

/// Tax the land itself has pending, per token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTax {
    pub token: Felt,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTax {
    pub token: TokenRef,
    pub total: Amount,
}

impl TokenTax {
    pub fn symbol(&self) -> &str {
        self.token.symbol()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedTaxes {
    /// One entry per token, in first-seen order.
    pub taxes: Vec<TokenTax>,
    pub nukable: Vec<Location>,
}

/// Folds claimable and pending taxes into per-token totals. Zero amounts are
/// skipped, though a zero claim still reports its land as nukable.
pub fn aggregate_taxes(
    next_claims: &[ClaimInfo],
    pending: &[PendingTax],
    tokens: &TokenTable,
) -> AggregatedTaxes {
    let mut result = AggregatedTaxes::default();
    let mut index: HashMap<Felt, usize> = HashMap::new();

    let mut add = |token: Felt, amount: Amount, taxes: &mut Vec<TokenTax>| {
        if amount.is_zero() {
            return;
        }
        match index.get(&token) {
            Some(slot) => taxes[*slot].total = taxes[*slot].total.saturating_add(amount),
            None => {
                index.insert(token, taxes.len());
                taxes.push(TokenTax {
                    token: tokens.resolve(token),
                    total: amount,
                });
            }
        }
    };

    for claim in next_claims {
        if claim.can_be_nuked {
            result.nukable.push(claim.land_location);
        }
        add(claim.token, claim.amount, &mut result.taxes);
    }
    for tax in pending {
        add(tax.token, tax.amount, &mut result.taxes);
    }
    result
}

/// Claims the land at `location` could collect right now, estimated from
/// each live neighboring building's listed price and last payment.
pub fn estimate_next_claims<S: CellSource + ?Sized>(
    location: Location,
    source: &S,
    now: u64,
    config: &GameConfig,
) -> Vec<ClaimInfo> {
    neighbors_of(location, source.side())
        .iter()
        .filter_map(|candidate| source.land(candidate))
        .filter_map(|neighbor| {
            let building = neighbor.as_building()?;
            if !neighbor.is_live() {
                return None;
            }
            let elapsed = now.saturating_sub(building.stake.last_pay_time) as f64;
            let share = tax_per_neighbor(building.sell_price, config) * elapsed
                / config.tax_period_seconds as f64;
            let their_live = live_neighbor_count(neighbor.location(), source);
            let owed_total = accrued_tax(building, their_live, now, config);
            Some(ClaimInfo {
                token: building.token.address(),
                amount: Amount::from_f64(share).min(building.stake.amount),
                land_location: neighbor.location(),
                can_be_nuked: their_live > 0 && owed_total >= building.stake.amount,
            })
        })
        .collect()
}
