use std::fmt::Write as _;

use color_eyre::Result;
use land_core::{
    aggregate_taxes, aggregate_yield, current_auction_price, estimate_next_claims, level_progress,
    reclaim_outlook, seconds_until_floor, CellView, LandGrid, LandState, Location,
    ReclaimEstimate,
};

fn seconds_label(estimate: ReclaimEstimate) -> String {
    match estimate {
        ReclaimEstimate::Unbounded => "never".to_string(),
        ReclaimEstimate::Seconds(seconds) => format!("{:.0}s", seconds),
    }
}

pub fn describe_cell(grid: &LandGrid, view: &CellView, now: u64) -> String {
    let config = grid.config();
    let side = config.grid_size;
    let (x, y) = view.location().coordinates(side);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "land {} ({x},{y}) {:?} version {}",
        view.location(),
        view.kind(),
        view.version
    );

    match view.state() {
        LandState::Empty => {
            if let Some(stake) = grid.pending_stake(view.location()) {
                let _ = writeln!(
                    out,
                    "  pending stake {} (paid {})",
                    stake.amount, stake.last_pay_time
                );
            }
        }
        LandState::Auction(auction) => {
            let price = current_auction_price(auction, now, config);
            let _ = writeln!(
                out,
                "  auction start {} floor {} now {} finished {}",
                auction.start_price, auction.floor_price, price, auction.is_finished
            );
            if let Some(seconds) = seconds_until_floor(auction, now, config) {
                let _ = writeln!(out, "  floor in {seconds}s");
            }
        }
        LandState::Building(building) => {
            let _ = writeln!(
                out,
                "  owner {} price {} stake {}",
                building.owner.short(),
                building.token.display_amount(building.sell_price),
                building.token.display_amount(building.stake.amount)
            );
            if let Some(outlook) = reclaim_outlook(view, grid, now, config) {
                let _ = writeln!(
                    out,
                    "  neighbors {} accrued {} remaining {} reclaim in {}{}",
                    outlook.live_neighbors,
                    outlook.accrued,
                    outlook.remaining_stake,
                    seconds_label(outlook.time_left),
                    if outlook.is_nukable() { " (nukable)" } else { "" }
                );
            }
            let level = level_progress(building.bought_at, building.level, now, config);
            let _ = writeln!(
                out,
                "  level {} of {} expected{}",
                level.current_level,
                level.expected_level,
                if level.can_level_up { ", can level up" } else { "" }
            );
        }
    }

    let yields = aggregate_yield(view.location(), grid, config);
    let _ = write!(
        out,
        "  yield {}/{} slots",
        yields.occupied_slots, yields.max_slots
    );
    for token in &yields.per_token {
        let _ = write!(
            out,
            ", {} {}/h",
            token.token.symbol(),
            token.token.display_amount(token.per_hour)
        );
    }
    out
}

pub fn describe_taxes(grid: &LandGrid, location: Location, now: u64) -> Result<String> {
    grid.cell_by_location(location)?;
    let claims = estimate_next_claims(location, grid, now, grid.config());
    let aggregated = aggregate_taxes(&claims, &[], grid.tokens());
    let mut out = String::new();
    for claim in &claims {
        let _ = writeln!(
            out,
            "from {} {} {}{}",
            claim.land_location,
            grid.tokens().symbol_for(&claim.token),
            claim.amount,
            if claim.can_be_nuked { " (nukable)" } else { "" }
        );
    }
    for tax in &aggregated.taxes {
        let _ = writeln!(
            out,
            "total {} {}",
            tax.symbol(),
            tax.token.display_amount(tax.total)
        );
    }
    Ok(out)
}
