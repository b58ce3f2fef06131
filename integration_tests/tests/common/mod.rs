#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Once};

use land_core::{load_game_config_from_env, LandGrid, TokenTable, CONFIG_PATH_ENV};
use land_schema::{fields, EntityUpdate, ModelKind};
use serde_json::json;

pub const NS: &str = "ponzi_land";
pub const LORDS: &str = "0x05735fa6be5dd248350866644c0a137e571f9d637bb4db6532ddd63a95854b58";
pub const STRK: &str = "0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d";

static INIT: Once = Once::new();

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("test_game_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test game config at {}",
            config_path.display()
        );

        std::env::set_var(CONFIG_PATH_ENV, &config_path);
    });
}

/// A 16x16 grid configured from the test fixture.
pub fn test_grid() -> LandGrid {
    ensure_test_config();
    let (config, metadata) = load_game_config_from_env();
    debug_assert!(metadata.path().is_some(), "fixture config not picked up");
    LandGrid::new(config, TokenTable::builtin())
}

pub fn shared_grid() -> Arc<LandGrid> {
    Arc::new(test_grid())
}

fn entity(location: u32) -> String {
    format!("{location:#x}")
}

pub fn land(location: u32, owner: &str, price: u64, token: &str) -> EntityUpdate {
    EntityUpdate::new(entity(location)).with_model(
        NS,
        ModelKind::Land,
        fields(json!({
            "location": location,
            "owner": owner,
            "block_date_bought": 0,
            "sell_price": price,
            "token_used": token,
            "level": "Zero",
        })),
    )
}

pub fn stake(location: u32, amount: u64, last_pay_time: u64) -> EntityUpdate {
    EntityUpdate::new(entity(location)).with_model(
        NS,
        ModelKind::LandStake,
        fields(json!({
            "location": location,
            "amount": amount,
            "last_pay_time": last_pay_time,
        })),
    )
}

pub fn auction(location: u32, start_price: u64, floor_price: u64, finished: bool) -> EntityUpdate {
    EntityUpdate::new(entity(location)).with_model(
        NS,
        ModelKind::Auction,
        fields(json!({
            "land_location": location,
            "start_time": 0,
            "start_price": start_price,
            "floor_price": floor_price,
            "decay_rate": 0,
            "is_finished": finished,
            "sold_at_price": { "None": [] },
        })),
    )
}

/// Updates for a small neighborhood: buildings around (3,3) with their
/// stakes, plus two running auctions with stakes buffered behind them.
pub fn neighborhood_updates() -> Vec<EntityUpdate> {
    let mut updates = Vec::new();
    for (location, price, amount) in [(51, 1_000, 400), (50, 2_000, 10_000), (35, 1_000, 60)] {
        updates.push(land(location, "0xabc", price, LORDS));
        updates.push(stake(location, amount, 0));
    }
    updates.push(land(52, "0xdef", 4_000, STRK));
    updates.push(stake(52, 900, 0));
    for location in [100, 200] {
        updates.push(auction(location, 2_000, 1_000, false));
        updates.push(stake(location, 250, 0));
    }
    updates
}
