//! Auction price decay.
//!
//! Prices fall from `start_price` to `floor_price` over
//! `auction_duration_seconds` of game time. A zero decay rate decays
//! linearly; otherwise the curve is exponential with steepness
//! `decay_rate / decay_scale`, normalized so both ends still meet.

use land_schema::Amount;

use crate::cell::AuctionLand;
use crate::config::GameConfig;

const MIN_STEEPNESS: f64 = 1e-9;

/// Price an auction would sell at, at unix time `now`.
pub fn current_auction_price(auction: &AuctionLand, now: u64, config: &GameConfig) -> Amount {
    if auction.is_finished {
        return auction.sold_at_price.unwrap_or(auction.floor_price);
    }
    if now <= auction.start_time {
        return auction.start_price;
    }
    if auction.start_price <= auction.floor_price {
        return auction.floor_price;
    }

    let elapsed = (now - auction.start_time).saturating_mul(config.game_speed);
    if elapsed >= config.auction_duration_seconds {
        return auction.floor_price;
    }

    let progress = elapsed as f64 / config.auction_duration_seconds as f64;
    let steepness = auction.decay_rate as f64 / config.decay_scale as f64;
    let remaining = if steepness < MIN_STEEPNESS {
        1.0 - progress
    } else {
        let tail = (-steepness).exp();
        ((-steepness * progress).exp() - tail) / (1.0 - tail)
    };

    let span = (auction.start_price.raw() - auction.floor_price.raw()) as f64;
    let price = auction
        .floor_price
        .saturating_add(Amount::from_f64(span * remaining));
    price.clamp(auction.floor_price, auction.start_price)
}

/// Wall-clock seconds until the auction reaches its floor, `None` once it
/// has finished.
pub fn seconds_until_floor(auction: &AuctionLand, now: u64, config: &GameConfig) -> Option<u64> {
    if auction.is_finished {
        return None;
    }
    let wall_duration = config.auction_duration_seconds.div_ceil(config.game_speed);
    let end = auction.start_time.saturating_add(wall_duration);
    Some(end.saturating_sub(now))
}
