use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use land_core::{GameConfig, LandGrid, TokenTable};
use land_schema::{fields, EntityUpdate, ModelKind};
use serde_json::json;

const NS: &str = "ponzi_land";
const LORDS: &str = "0x05735fa6be5dd248350866644c0a137e571f9d637bb4db6532ddd63a95854b58";

fn fresh_grid(side: u32) -> LandGrid {
    LandGrid::new(
        Arc::new(GameConfig::default().with_grid_size(side)),
        TokenTable::builtin(),
    )
}

/// Stake, auction and land updates for every cell, with stakes arriving
/// first so every one of them is buffered.
fn bootstrap_updates(side: u32) -> Vec<EntityUpdate> {
    let mut updates = Vec::with_capacity((side * side * 3) as usize);
    for location in 0..side * side {
        updates.push(EntityUpdate::new(format!("{location:#x}")).with_model(
            NS,
            ModelKind::LandStake,
            fields(json!({
                "location": location,
                "amount": "0xde0b6b3a7640000",
                "last_pay_time": 1_700_000_000u64,
            })),
        ));
        if location % 5 == 0 {
            updates.push(EntityUpdate::new(format!("{location:#x}")).with_model(
                NS,
                ModelKind::Auction,
                fields(json!({
                    "land_location": location,
                    "start_time": 1_700_000_000u64,
                    "start_price": "0x1bc16d674ec80000",
                    "floor_price": "0xde0b6b3a7640000",
                    "decay_rate": 200,
                    "is_finished": false,
                    "sold_at_price": { "None": [] },
                })),
            ));
        } else {
            updates.push(EntityUpdate::new(format!("{location:#x}")).with_model(
                NS,
                ModelKind::Land,
                fields(json!({
                    "location": location,
                    "owner": "0x05144466224fde5d648d6295a2fb6e7cd45f2ca3ede06196728026f12c84c9ff",
                    "block_date_bought": 1_700_000_000u64,
                    "sell_price": "0x2b5e3af16b1880000",
                    "token_used": LORDS,
                    "level": { "First": [] },
                })),
            ));
        }
    }
    updates
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_apply");

    for side in [16u32, 32, 64] {
        let updates = bootstrap_updates(side);
        group.bench_with_input(BenchmarkId::new("bootstrap", side), &side, |b, &side| {
            b.iter_batched(
                || fresh_grid(side),
                |grid| {
                    for update in &updates {
                        grid.apply(update);
                    }
                    grid
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("redelivery", side), &side, |b, &side| {
            let grid = fresh_grid(side);
            for update in &updates {
                grid.apply(update);
            }
            b.iter(|| {
                for update in &updates {
                    grid.apply(update);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_apply);
criterion_main!(benches);
