//! Getting indexer updates into the grid: the one-off paged bootstrap and
//! the live feed that follows it.

use std::{
    io::{self, BufRead},
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::Receiver;
use land_schema::EntityUpdate;
use thiserror::Error;

use crate::grid::{ApplyOutcome, LandGrid};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("entity source i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("entity record on line {line} is not valid: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("entity source failed: {0}")]
    Remote(String),
}

/// Paged point-query collaborator used once before the live feed.
pub trait EntitySource {
    fn fetch_page(&mut self, page: u32, page_size: u32) -> Result<Vec<EntityUpdate>, SourceError>;
}

/// In-memory source, mostly for captures and tests.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    updates: Vec<EntityUpdate>,
}

impl VecSource {
    pub fn new(updates: Vec<EntityUpdate>) -> Self {
        Self { updates }
    }
}

impl EntitySource for VecSource {
    fn fetch_page(&mut self, page: u32, page_size: u32) -> Result<Vec<EntityUpdate>, SourceError> {
        let size = page_size.max(1) as usize;
        let start = (page as usize).saturating_mul(size);
        Ok(self
            .updates
            .iter()
            .skip(start)
            .take(size)
            .cloned()
            .collect())
    }
}

/// Reads one JSON update per line, skipping blank lines.
pub fn read_updates_jsonl<R: BufRead>(reader: R) -> Result<Vec<EntityUpdate>, SourceError> {
    let mut updates = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let update = serde_json::from_str(&line).map_err(|source| SourceError::Json {
            line: index + 1,
            source,
        })?;
        updates.push(update);
    }
    Ok(updates)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub received: usize,
    pub updated: usize,
    pub buffered: usize,
    pub unchanged: usize,
    pub dropped: usize,
}

impl IngestStats {
    pub fn record(&mut self, outcome: &ApplyOutcome) {
        self.received += 1;
        match outcome {
            ApplyOutcome::Updated { .. } => self.updated += 1,
            ApplyOutcome::Buffered { .. } => self.buffered += 1,
            ApplyOutcome::Unchanged => self.unchanged += 1,
            ApplyOutcome::Dropped(_) => self.dropped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub pages: u32,
    pub stats: IngestStats,
}

/// Pages through `source` from page zero until an empty page, applying every
/// update. A failing page stops the bootstrap; whatever was applied stays.
pub fn bootstrap<S: EntitySource + ?Sized>(
    grid: &LandGrid,
    source: &mut S,
) -> Result<BootstrapReport, SourceError> {
    let page_size = grid.config().bootstrap_page_size.max(1);
    let mut report = BootstrapReport::default();
    loop {
        let batch = match source.fetch_page(report.pages, page_size) {
            Ok(batch) => batch,
            Err(err) => {
                tracing::warn!(
                    target: "ponziland::ingest",
                    page = report.pages,
                    error = %err,
                    "bootstrap.page_failed"
                );
                return Err(err);
            }
        };
        if batch.is_empty() {
            break;
        }
        for update in &batch {
            report.stats.record(&grid.apply(update));
        }
        report.pages += 1;
        if batch.len() < page_size as usize {
            break;
        }
    }
    tracing::info!(
        target: "ponziland::ingest",
        pages = report.pages,
        updated = report.stats.updated,
        dropped = report.stats.dropped,
        version = grid.version(),
        "bootstrap.complete"
    );
    Ok(report)
}

/// Worker applying live updates. Dropping every sender ends the feed.
pub struct FeedHandle {
    handle: JoinHandle<IngestStats>,
}

impl FeedHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the feed to drain and returns what it processed.
    pub fn join(self) -> thread::Result<IngestStats> {
        self.handle.join()
    }
}

pub fn spawn_feed(grid: Arc<LandGrid>, receiver: Receiver<EntityUpdate>) -> FeedHandle {
    let handle = thread::spawn(move || run_feed(&grid, &receiver));
    FeedHandle { handle }
}

fn run_feed(grid: &LandGrid, receiver: &Receiver<EntityUpdate>) -> IngestStats {
    let mut stats = IngestStats::default();
    for update in receiver.iter() {
        stats.record(&grid.apply(&update));
    }
    tracing::info!(
        target: "ponziland::ingest",
        received = stats.received,
        updated = stats.updated,
        dropped = stats.dropped,
        "live_feed.closed"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::tokens::TokenTable;
    use crossbeam_channel::unbounded;
    use land_schema::{fields, ModelKind};
    use serde_json::json;

    fn stake(location: u32) -> EntityUpdate {
        EntityUpdate::new(format!("s{location}")).with_model(
            "ponzi_land",
            ModelKind::LandStake,
            fields(json!({ "location": location, "amount": 1, "last_pay_time": 0 })),
        )
    }

    fn land(location: u32) -> EntityUpdate {
        EntityUpdate::new(format!("l{location}")).with_model(
            "ponzi_land",
            ModelKind::Land,
            fields(json!({
                "location": location,
                "owner": "0xabc",
                "block_date_bought": 1,
                "sell_price": 10,
                "token_used": "0x7",
                "level": "Zero",
            })),
        )
    }

    fn small_grid(page_size: u32) -> LandGrid {
        let mut config = GameConfig::default().with_grid_size(8);
        config.bootstrap_page_size = page_size;
        LandGrid::new(Arc::new(config), TokenTable::builtin())
    }

    struct FailingSource;

    impl EntitySource for FailingSource {
        fn fetch_page(&mut self, _: u32, _: u32) -> Result<Vec<EntityUpdate>, SourceError> {
            Err(SourceError::Remote("indexer unavailable".to_string()))
        }
    }

    #[test]
    fn bootstrap_walks_every_page() {
        let grid = small_grid(2);
        let mut source = VecSource::new((0..5).map(land).collect());
        let report = bootstrap(&grid, &mut source).unwrap();
        assert_eq!(report.pages, 3);
        assert_eq!(report.stats.updated, 5);
        assert_eq!(grid.snapshot().occupied().count(), 5);
    }

    #[test]
    fn bootstrap_surfaces_source_failure() {
        let grid = small_grid(2);
        assert!(matches!(
            bootstrap(&grid, &mut FailingSource),
            Err(SourceError::Remote(_))
        ));
    }

    #[test]
    fn jsonl_reports_bad_line() {
        let input = "{\"entityId\":\"a\",\"models\":{}}\n\nnot json\n";
        match read_updates_jsonl(input.as_bytes()) {
            Err(SourceError::Json { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn feed_runs_until_senders_drop() {
        let grid = Arc::new(small_grid(50));
        let (sender, receiver) = unbounded();
        let feed = spawn_feed(Arc::clone(&grid), receiver);

        sender.send(stake(3)).unwrap();
        sender.send(land(3)).unwrap();
        sender.send(land(3)).unwrap();
        drop(sender);

        let stats = feed.join().unwrap();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.buffered, 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.unchanged, 1);
        let cell = grid.cell_by_location(crate::location::Location(3)).unwrap();
        assert_eq!(cell.stake().map(|stake| stake.amount.raw()), Some(1));
    }
}
