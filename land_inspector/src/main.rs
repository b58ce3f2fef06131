use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use land_core::{
    bootstrap, delta_since, frame, load_game_config_from_env, load_token_table_from_env,
    read_updates_jsonl, render_ascii, GameConfig, LandGrid, Location, TokenTable, VecSource,
};
use land_runtime::{parse_command_line, DryRunSubmitter, StaticSession, TransactionSubmitter};
use land_schema::{encode_frame_json, Felt};
use tracing::info;

mod report;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replays a land capture and inspects the reconciled grid", long_about = None)]
struct Cli {
    /// JSONL capture of indexer entity updates, one per line.
    #[arg(long)]
    capture: PathBuf,
    /// Game config JSON; falls back to PONZILAND_CONFIG_PATH or the builtin.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Token table JSON; falls back to PONZILAND_TOKENS_PATH or the builtin.
    #[arg(long)]
    tokens: Option<PathBuf>,
    /// Unix time used for every time-dependent projection.
    #[arg(long, default_value_t = 0)]
    now: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints the grid as a character map.
    Map,
    /// Shows one land and its economics.
    Cell {
        /// Linear index of the land.
        location: u32,
    },
    /// Shows what a land can claim from its neighbors.
    Taxes { location: u32 },
    /// Prints the full frame, or the delta since a version, as JSON.
    Frame {
        #[arg(long)]
        since: Option<u64>,
    },
    /// Parses an action and prints the multicall it would submit.
    Call {
        /// Account the dry run submits as.
        #[arg(long, default_value = "0x0")]
        sender: String,
        /// Action text, e.g. `buy 3,1 LORDS 1000 500`.
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let grid = replay(&cli)?;
    let side = grid.config().grid_size;

    match &cli.command {
        Command::Map => {
            print!("{}", render_ascii(&grid.snapshot(), side));
            for (location, stake) in grid.pending_stakes() {
                println!("pending stake at {location}: {}", stake.amount);
            }
        }
        Command::Cell { location } => {
            let view = grid.cell_by_location(Location(*location))?;
            println!("{}", report::describe_cell(&grid, &view, cli.now));
        }
        Command::Taxes { location } => {
            println!(
                "{}",
                report::describe_taxes(&grid, Location(*location), cli.now)?
            );
        }
        Command::Frame { since } => {
            let snapshot = grid.snapshot();
            let json = match since {
                Some(version) => {
                    serde_json::to_string_pretty(&delta_since(&snapshot, side, *version))?
                }
                None => encode_frame_json(&frame(&snapshot, side))?,
            };
            println!("{json}");
        }
        Command::Call { sender, text } => {
            let line = text.join(" ");
            let command =
                parse_command_line(&line).wrap_err_with(|| format!("parsing '{line}'"))?;
            let calls = command.to_calls(&grid, cli.now)?;
            let sender: Felt = sender
                .parse()
                .map_err(|err| eyre!("invalid sender '{sender}': {err}"))?;
            let handle = DryRunSubmitter::new().submit(&StaticSession(sender), &calls)?;
            println!("{}", serde_json::to_string_pretty(&calls)?);
            info!(hash = %handle.hash, calls = handle.call_count, "call.dry_run");
        }
    }

    Ok(())
}

fn replay(cli: &Cli) -> Result<LandGrid> {
    let config = match &cli.config {
        Some(path) => Arc::new(
            GameConfig::from_file(path)
                .wrap_err_with(|| format!("loading game config {}", path.display()))?,
        ),
        None => load_game_config_from_env().0,
    };
    let tokens = match &cli.tokens {
        Some(path) => Arc::new(
            TokenTable::from_file(path)
                .wrap_err_with(|| format!("loading token table {}", path.display()))?,
        ),
        None => load_token_table_from_env(),
    };

    let updates = read_capture(&cli.capture)?;
    let grid = LandGrid::new(config, tokens);
    let report = bootstrap(&grid, &mut VecSource::new(updates))?;
    info!(
        pages = report.pages,
        received = report.stats.received,
        dropped = report.stats.dropped,
        version = grid.version(),
        "capture.replayed"
    );
    Ok(grid)
}

fn read_capture(path: &Path) -> Result<Vec<land_schema::EntityUpdate>> {
    let file = File::open(path).wrap_err_with(|| format!("opening capture {}", path.display()))?;
    Ok(read_updates_jsonl(BufReader::new(file))?)
}
