//! Ledger call descriptors for the land actions.
//!
//! Every builder checks the reconciled grid first, so an action that the
//! contracts would certainly reject never reaches the submitter. Spending
//! actions are preceded by the token approvals they need.

use land_core::{
    current_auction_price, level_progress, reclaim_outlook, BuildingLand, CellView, GridError,
    LandGrid, Location,
};
use land_schema::{Amount, Felt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "address")]
pub enum CallTarget {
    /// The game's actions contract.
    Actions,
    Token(Felt),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandCall {
    pub target: CallTarget,
    pub entrypoint: String,
    pub calldata: Vec<String>,
}

impl LandCall {
    fn actions(entrypoint: &str, calldata: Vec<String>) -> Self {
        Self {
            target: CallTarget::Actions,
            entrypoint: entrypoint.to_string(),
            calldata,
        }
    }

    fn approve(token: Felt, amount: Amount) -> Self {
        let mut calldata = vec![CallTarget::ACTIONS_SPENDER.to_string()];
        calldata.extend(u256(amount));
        Self {
            target: CallTarget::Token(token),
            entrypoint: "approve".to_string(),
            calldata,
        }
    }
}

impl CallTarget {
    /// Placeholder the submitter swaps for the deployed actions address.
    pub const ACTIONS_SPENDER: &'static str = "actions";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("land {location} holds no building")]
    NotABuilding { location: Location },
    #[error("land {location} has no running auction")]
    NotAnActiveAuction { location: Location },
    #[error("new price {requested} must exceed the current price {current}")]
    PriceNotIncreased { current: Amount, requested: Amount },
    #[error("{field} must be greater than zero")]
    ZeroAmount { field: &'static str },
    #[error("land {location} still has stake left")]
    NotNukable { location: Location },
    #[error("land {location} is level {current}, level {expected} is not reached yet")]
    CannotLevelUp {
        location: Location,
        current: u8,
        expected: u8,
    },
    #[error("no land to claim from")]
    NothingToClaim,
    #[error("floor price {floor} is above start price {start}")]
    InvalidFloor { start: Amount, floor: Amount },
    #[error("land {location} is not empty")]
    NotEmpty { location: Location },
}

/// Listing parameters shared by `buy` and `bid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub token_for_sale: Felt,
    pub sell_price: Amount,
    pub amount_to_stake: Amount,
    pub liquidity_pool: Felt,
}

impl Listing {
    fn validate(&self) -> Result<(), CallError> {
        if self.sell_price.is_zero() {
            return Err(CallError::ZeroAmount {
                field: "sell_price",
            });
        }
        if self.amount_to_stake.is_zero() {
            return Err(CallError::ZeroAmount {
                field: "amount_to_stake",
            });
        }
        Ok(())
    }

    fn calldata(&self, location: Location) -> Vec<String> {
        let mut calldata = vec![location.to_padded_hex(), self.token_for_sale.to_string()];
        calldata.extend(u256(self.sell_price));
        calldata.extend(u256(self.amount_to_stake));
        calldata.push(self.liquidity_pool.to_string());
        calldata
    }
}

/// Amounts travel as a 256-bit integer split into low and high halves.
fn u256(amount: Amount) -> [String; 2] {
    let wide = amount.as_u256();
    [format!("{:#x}", wide.low()), format!("{:#x}", wide.high())]
}

fn view(grid: &LandGrid, location: Location) -> Result<CellView, CallError> {
    Ok(grid.cell_by_location(location)?)
}

fn require_building(
    grid: &LandGrid,
    location: Location,
) -> Result<(CellView, BuildingLand), CallError> {
    let view = view(grid, location)?;
    let building = view
        .as_building()
        .cloned()
        .ok_or(CallError::NotABuilding { location })?;
    Ok((view, building))
}

/// Approvals for paying `price` in `price_token` while staking in the
/// listing's token, merged when both are the same currency.
fn purchase_approvals(listing: &Listing, price_token: Felt, price: Amount) -> Vec<LandCall> {
    if price_token == listing.token_for_sale {
        vec![LandCall::approve(
            listing.token_for_sale,
            listing.amount_to_stake.saturating_add(price),
        )]
    } else {
        vec![
            LandCall::approve(listing.token_for_sale, listing.amount_to_stake),
            LandCall::approve(price_token, price),
        ]
    }
}

/// Buys an owned building at its listed price.
pub fn buy(
    grid: &LandGrid,
    location: Location,
    listing: &Listing,
) -> Result<Vec<LandCall>, CallError> {
    listing.validate()?;
    let (_, building) = require_building(grid, location)?;
    let mut calls = purchase_approvals(listing, building.token.address(), building.sell_price);
    calls.push(LandCall::actions("buy", listing.calldata(location)));
    Ok(calls)
}

/// Bids on a running auction at its current decayed price.
pub fn bid(
    grid: &LandGrid,
    location: Location,
    listing: &Listing,
    now: u64,
) -> Result<Vec<LandCall>, CallError> {
    listing.validate()?;
    let view = view(grid, location)?;
    let auction = view
        .as_auction()
        .filter(|auction| !auction.is_finished)
        .ok_or(CallError::NotAnActiveAuction { location })?;
    let price = current_auction_price(auction, now, grid.config());
    let mut calls = purchase_approvals(listing, grid.config().base_token, price);
    calls.push(LandCall::actions("bid", listing.calldata(location)));
    Ok(calls)
}

pub fn claim(grid: &LandGrid, location: Location) -> Result<Vec<LandCall>, CallError> {
    require_building(grid, location)?;
    Ok(vec![LandCall::actions("claim", vec![location.to_padded_hex()])])
}

/// One `claim` per land, submitted as a single multicall.
pub fn claim_all(grid: &LandGrid, locations: &[Location]) -> Result<Vec<LandCall>, CallError> {
    if locations.is_empty() {
        return Err(CallError::NothingToClaim);
    }
    let mut calls = Vec::with_capacity(locations.len());
    for location in locations {
        calls.extend(claim(grid, *location)?);
    }
    Ok(calls)
}

/// Reclaims a building whose stake is exhausted.
pub fn nuke(grid: &LandGrid, location: Location, now: u64) -> Result<Vec<LandCall>, CallError> {
    let (view, _) = require_building(grid, location)?;
    let nukable = reclaim_outlook(&view, grid, now, grid.config())
        .map(|outlook| outlook.is_nukable())
        .unwrap_or(false);
    if !nukable {
        return Err(CallError::NotNukable { location });
    }
    Ok(vec![LandCall::actions("nuke", vec![location.to_padded_hex()])])
}

pub fn increase_price(
    grid: &LandGrid,
    location: Location,
    new_price: Amount,
) -> Result<Vec<LandCall>, CallError> {
    let (_, building) = require_building(grid, location)?;
    let current = building.sell_price;
    if new_price <= current {
        return Err(CallError::PriceNotIncreased {
            current,
            requested: new_price,
        });
    }
    let mut calldata = vec![location.to_padded_hex()];
    calldata.extend(u256(new_price));
    Ok(vec![LandCall::actions("increase_price", calldata)])
}

pub fn increase_stake(
    grid: &LandGrid,
    location: Location,
    amount: Amount,
) -> Result<Vec<LandCall>, CallError> {
    if amount.is_zero() {
        return Err(CallError::ZeroAmount {
            field: "amount_to_stake",
        });
    }
    let (_, building) = require_building(grid, location)?;
    let mut calldata = vec![location.to_padded_hex()];
    calldata.extend(u256(amount));
    Ok(vec![
        LandCall::approve(building.token.address(), amount),
        LandCall::actions("increase_stake", calldata),
    ])
}

pub fn level_up(grid: &LandGrid, location: Location, now: u64) -> Result<Vec<LandCall>, CallError> {
    let (_, building) = require_building(grid, location)?;
    let info = level_progress(building.bought_at, building.level, now, grid.config());
    if !info.can_level_up {
        return Err(CallError::CannotLevelUp {
            location,
            current: info.current_level,
            expected: info.expected_level,
        });
    }
    Ok(vec![LandCall::actions("level_up", vec![location.to_padded_hex()])])
}

/// Starts an auction on an empty land.
pub fn auction(
    grid: &LandGrid,
    location: Location,
    start_price: Amount,
    floor_price: Amount,
    decay_rate: u64,
    is_from_nuke: bool,
) -> Result<Vec<LandCall>, CallError> {
    if floor_price > start_price {
        return Err(CallError::InvalidFloor {
            start: start_price,
            floor: floor_price,
        });
    }
    if !view(grid, location)?.is_empty() {
        return Err(CallError::NotEmpty { location });
    }
    let mut calldata = vec![location.to_padded_hex()];
    calldata.extend(u256(start_price));
    calldata.extend(u256(floor_price));
    calldata.push(format!("{decay_rate:#x}"));
    calldata.push(if is_from_nuke { "0x1" } else { "0x0" }.to_string());
    Ok(vec![LandCall::actions("auction", calldata)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use land_core::{GameConfig, TokenTable};
    use land_schema::{fields, EntityUpdate, ModelKind};
    use serde_json::json;
    use std::sync::Arc;

    const NS: &str = "ponzi_land";
    const LORDS: &str = "0x05735fa6be5dd248350866644c0a137e571f9d637bb4db6532ddd63a95854b58";
    const STRK: &str = "0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d";

    fn grid() -> LandGrid {
        let grid = LandGrid::new(
            Arc::new(GameConfig::default().with_grid_size(8)),
            TokenTable::builtin(),
        );
        grid.apply(&EntityUpdate::new("l9").with_model(
            NS,
            ModelKind::Land,
            fields(json!({
                "location": 9,
                "owner": "0xabc",
                "block_date_bought": 0,
                "sell_price": 1000,
                "token_used": LORDS,
                "level": "Zero",
            })),
        ));
        grid.apply(&EntityUpdate::new("l9").with_model(
            NS,
            ModelKind::LandStake,
            fields(json!({ "location": 9, "amount": 100, "last_pay_time": 0 })),
        ));
        grid.apply(&EntityUpdate::new("a3").with_model(
            NS,
            ModelKind::Auction,
            fields(json!({
                "land_location": 3,
                "start_time": 0,
                "start_price": 2000,
                "floor_price": 1000,
                "decay_rate": 0,
                "is_finished": false,
            })),
        ));
        grid
    }

    fn listing(token: &str) -> Listing {
        Listing {
            token_for_sale: token.parse().unwrap(),
            sell_price: Amount(5_000),
            amount_to_stake: Amount(300),
            liquidity_pool: Felt::from_u128(0x1),
        }
    }

    #[test]
    fn buy_in_same_token_merges_approval() {
        let calls = buy(&grid(), Location(9), &listing(LORDS)).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].entrypoint, "approve");
        assert_eq!(calls[0].calldata[1], format!("{:#x}", 1_300));
        assert_eq!(calls[1].entrypoint, "buy");
        assert_eq!(calls[1].calldata.len(), 7);
        assert_eq!(calls[1].calldata[0], Location(9).to_padded_hex());
    }

    #[test]
    fn bid_pays_decayed_price_in_base_token() {
        let grid = grid();
        let calls = bid(&grid, Location(3), &listing(STRK), 0).unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].target, CallTarget::Token(STRK.parse().unwrap()));
        assert_eq!(calls[1].target, CallTarget::Token(grid.config().base_token));
        assert_eq!(calls[1].calldata[1], format!("{:#x}", 2_000));
        assert_eq!(calls[2].entrypoint, "bid");

        assert_eq!(
            bid(&grid, Location(9), &listing(STRK), 0).unwrap_err(),
            CallError::NotAnActiveAuction {
                location: Location(9)
            }
        );
    }

    #[test]
    fn building_only_actions_are_checked() {
        let grid = grid();
        assert_eq!(
            increase_stake(&grid, Location(3), Amount(5)).unwrap_err(),
            CallError::NotABuilding {
                location: Location(3)
            }
        );
        assert!(matches!(
            claim(&grid, Location(64)),
            Err(CallError::Grid(GridError::LocationOutOfBounds { .. }))
        ));
        assert_eq!(
            increase_price(&grid, Location(9), Amount(1_000)).unwrap_err(),
            CallError::PriceNotIncreased {
                current: Amount(1_000),
                requested: Amount(1_000)
            }
        );
        assert_eq!(claim_all(&grid, &[]).unwrap_err(), CallError::NothingToClaim);
    }

    #[test]
    fn nuke_waits_for_empty_stake() {
        let grid = grid();
        // Isolated building: nothing drains its stake.
        assert!(matches!(
            nuke(&grid, Location(9), 1_000_000),
            Err(CallError::NotNukable { .. })
        ));
        grid.apply(&EntityUpdate::new("l10").with_model(
            NS,
            ModelKind::Land,
            fields(json!({
                "location": 10,
                "owner": "0xdef",
                "block_date_bought": 0,
                "sell_price": 1000,
                "token_used": LORDS,
                "level": "Zero",
            })),
        ));
        assert!(matches!(
            nuke(&grid, Location(9), 60),
            Err(CallError::NotNukable { .. })
        ));
        let calls = nuke(&grid, Location(9), 3 * 3_600).unwrap();
        assert_eq!(calls[0].entrypoint, "nuke");
    }

    #[test]
    fn level_up_requires_elapsed_time() {
        let grid = grid();
        assert!(matches!(
            level_up(&grid, Location(9), 10),
            Err(CallError::CannotLevelUp {
                current: 1,
                expected: 1,
                ..
            })
        ));
        let calls = level_up(&grid, Location(9), 8_640).unwrap();
        assert_eq!(calls[0].calldata, vec![Location(9).to_padded_hex()]);
    }

    #[test]
    fn auction_rejects_floor_above_start() {
        let grid = grid();
        assert!(matches!(
            auction(&grid, Location(1), Amount(10), Amount(20), 0, false),
            Err(CallError::InvalidFloor { .. })
        ));
        let calls = auction(&grid, Location(1), Amount(20), Amount(10), 5, true).unwrap();
        assert_eq!(calls[0].calldata.last().map(String::as_str), Some("0x1"));
    }

    #[test]
    fn auction_needs_an_empty_land() {
        let grid = grid();
        for occupied in [Location(9), Location(3)] {
            assert_eq!(
                auction(&grid, occupied, Amount(20), Amount(10), 0, false).unwrap_err(),
                CallError::NotEmpty { location: occupied }
            );
        }
        assert!(matches!(
            auction(&grid, Location(64), Amount(20), Amount(10), 0, false),
            Err(CallError::Grid(GridError::LocationOutOfBounds { .. }))
        ));
    }

    #[test]
    fn wide_amounts_split_into_words() {
        let grid = grid();
        let calls = increase_stake(&grid, Location(9), Amount(u128::MAX)).unwrap();
        assert_eq!(
            calls[1].calldata[1..],
            [format!("{:#x}", u128::MAX), "0x0".to_string()]
        );
    }
}
