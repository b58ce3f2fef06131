use std::num::ParseIntError;

use land_core::{LandGrid, Location, TokenTable};
use land_schema::{Amount, Felt, ValueError};
use thiserror::Error;

use crate::calls::{self, CallError, LandCall, Listing};

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error("invalid amount '{value}' for {context}: {source}")]
    InvalidAmount {
        value: String,
        context: &'static str,
        source: ValueError,
    },
    #[error("invalid flag '{0}'")]
    InvalidFlag(String),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("location {x},{y} is outside a {side}x{side} grid")]
    OutOfGrid { x: u32, y: u32, side: u32 },
    #[error("unknown token '{0}'")]
    UnknownToken(String),
    #[error(transparent)]
    Call(#[from] CallError),
}

/// A location as typed: a linear index or `x,y` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationArg {
    Index(u32),
    Coordinates(u32, u32),
}

impl LocationArg {
    pub fn resolve(self, side: u32) -> Result<Location, CommandError> {
        match self {
            LocationArg::Index(index) => Ok(Location(index)),
            LocationArg::Coordinates(x, y) if x < side && y < side => {
                Ok(Location::from_xy(x, y, side))
            }
            LocationArg::Coordinates(x, y) => Err(CommandError::OutOfGrid { x, y, side }),
        }
    }
}

/// A token as typed: a symbol from the token table or a raw address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenArg {
    Symbol(String),
    Address(Felt),
}

impl TokenArg {
    pub fn resolve(&self, tokens: &TokenTable) -> Result<Felt, CommandError> {
        match self {
            TokenArg::Address(address) => Ok(*address),
            TokenArg::Symbol(symbol) => tokens
                .iter()
                .find(|token| token.symbol.eq_ignore_ascii_case(symbol))
                .map(|token| token.address)
                .ok_or_else(|| CommandError::UnknownToken(symbol.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandCommand {
    Buy {
        location: LocationArg,
        token: TokenArg,
        price: Amount,
        stake: Amount,
    },
    Bid {
        location: LocationArg,
        token: TokenArg,
        price: Amount,
        stake: Amount,
    },
    Claim {
        location: LocationArg,
    },
    ClaimAll {
        locations: Vec<LocationArg>,
    },
    Nuke {
        location: LocationArg,
    },
    IncreasePrice {
        location: LocationArg,
        price: Amount,
    },
    IncreaseStake {
        location: LocationArg,
        amount: Amount,
    },
    LevelUp {
        location: LocationArg,
    },
    Auction {
        location: LocationArg,
        start_price: Amount,
        floor_price: Amount,
        decay_rate: u64,
        from_nuke: bool,
    },
}

impl LandCommand {
    /// Resolves the typed arguments against `grid` and builds the multicall.
    pub fn to_calls(&self, grid: &LandGrid, now: u64) -> Result<Vec<LandCall>, CommandError> {
        let side = grid.config().grid_size;
        let built = match self {
            LandCommand::Buy {
                location,
                token,
                price,
                stake,
            } => {
                let listing = listing(grid.tokens(), token, *price, *stake)?;
                calls::buy(grid, location.resolve(side)?, &listing)?
            }
            LandCommand::Bid {
                location,
                token,
                price,
                stake,
            } => {
                let listing = listing(grid.tokens(), token, *price, *stake)?;
                calls::bid(grid, location.resolve(side)?, &listing, now)?
            }
            LandCommand::Claim { location } => calls::claim(grid, location.resolve(side)?)?,
            LandCommand::ClaimAll { locations } => {
                let resolved = locations
                    .iter()
                    .map(|location| location.resolve(side))
                    .collect::<Result<Vec<_>, _>>()?;
                calls::claim_all(grid, &resolved)?
            }
            LandCommand::Nuke { location } => calls::nuke(grid, location.resolve(side)?, now)?,
            LandCommand::IncreasePrice { location, price } => {
                calls::increase_price(grid, location.resolve(side)?, *price)?
            }
            LandCommand::IncreaseStake { location, amount } => {
                calls::increase_stake(grid, location.resolve(side)?, *amount)?
            }
            LandCommand::LevelUp { location } => {
                calls::level_up(grid, location.resolve(side)?, now)?
            }
            LandCommand::Auction {
                location,
                start_price,
                floor_price,
                decay_rate,
                from_nuke,
            } => calls::auction(
                grid,
                location.resolve(side)?,
                *start_price,
                *floor_price,
                *decay_rate,
                *from_nuke,
            )?,
        };
        Ok(built)
    }
}

fn listing(
    tokens: &TokenTable,
    token: &TokenArg,
    sell_price: Amount,
    amount_to_stake: Amount,
) -> Result<Listing, CommandError> {
    let token_for_sale = token.resolve(tokens)?;
    let liquidity_pool = tokens
        .get(&token_for_sale)
        .and_then(|token| token.lp_address)
        .unwrap_or(Felt::ZERO);
    Ok(Listing {
        token_for_sale,
        sell_price,
        amount_to_stake,
        liquidity_pool,
    })
}

pub fn parse_command_line(input: &str) -> Result<LandCommand, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(CommandParseError::Empty)?;

    match verb.as_str() {
        "buy" | "bid" => {
            let location_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("location"))?;
            let token_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("token"))?;
            let price_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("price"))?;
            let stake_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("stake"))?;
            let location = parse_location(location_str, "land location")?;
            let token = parse_token(token_str);
            let price = parse_amount(price_str, "sell price")?;
            let stake = parse_amount(stake_str, "stake amount")?;
            if verb == "buy" {
                Ok(LandCommand::Buy {
                    location,
                    token,
                    price,
                    stake,
                })
            } else {
                Ok(LandCommand::Bid {
                    location,
                    token,
                    price,
                    stake,
                })
            }
        }
        "claim" => {
            let location_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("location"))?;
            let location = parse_location(location_str, "claim location")?;
            Ok(LandCommand::Claim { location })
        }
        "claim_all" | "claimall" => {
            let locations = parts
                .map(|part| parse_location(part, "claim location"))
                .collect::<Result<Vec<_>, _>>()?;
            if locations.is_empty() {
                return Err(CommandParseError::MissingArgument("locations"));
            }
            Ok(LandCommand::ClaimAll { locations })
        }
        "nuke" => {
            let location_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("location"))?;
            let location = parse_location(location_str, "nuke location")?;
            Ok(LandCommand::Nuke { location })
        }
        "increase_price" | "price" => {
            let location_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("location"))?;
            let price_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("price"))?;
            let location = parse_location(location_str, "land location")?;
            let price = parse_amount(price_str, "new price")?;
            Ok(LandCommand::IncreasePrice { location, price })
        }
        "increase_stake" | "stake" => {
            let location_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("location"))?;
            let amount_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("amount"))?;
            let location = parse_location(location_str, "land location")?;
            let amount = parse_amount(amount_str, "stake amount")?;
            Ok(LandCommand::IncreaseStake { location, amount })
        }
        "level_up" | "levelup" => {
            let location_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("location"))?;
            let location = parse_location(location_str, "land location")?;
            Ok(LandCommand::LevelUp { location })
        }
        "auction" => {
            let location_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("location"))?;
            let start_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("start price"))?;
            let floor_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("floor price"))?;
            let decay_str = parts.next().unwrap_or("0");
            let location = parse_location(location_str, "auction location")?;
            let start_price = parse_amount(start_str, "start price")?;
            let floor_price = parse_amount(floor_str, "floor price")?;
            let decay_rate = parse_u64(decay_str, "decay rate")?;
            let from_nuke = match parts.next().map(|flag| flag.to_ascii_lowercase()) {
                None => false,
                Some(flag) => match flag.as_str() {
                    "nuke" | "from_nuke" | "true" => true,
                    "false" => false,
                    other => return Err(CommandParseError::InvalidFlag(other.to_string())),
                },
            };
            Ok(LandCommand::Auction {
                location,
                start_price,
                floor_price,
                decay_rate,
                from_nuke,
            })
        }
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

fn parse_location(value: &str, context: &'static str) -> Result<LocationArg, CommandParseError> {
    match value.split_once(',') {
        Some((x, y)) => Ok(LocationArg::Coordinates(
            parse_u32(x, context)?,
            parse_u32(y, context)?,
        )),
        None => Ok(LocationArg::Index(parse_u32(value, context)?)),
    }
}

fn parse_token(value: &str) -> TokenArg {
    match value.parse::<Felt>() {
        Ok(address) if value.starts_with("0x") || value.starts_with("0X") => {
            TokenArg::Address(address)
        }
        _ => TokenArg::Symbol(value.to_string()),
    }
}

fn parse_u32(value: &str, context: &'static str) -> Result<u32, CommandParseError> {
    value
        .parse::<u32>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_u64(value: &str, context: &'static str) -> Result<u64, CommandParseError> {
    value
        .parse::<u64>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_amount(value: &str, context: &'static str) -> Result<Amount, CommandParseError> {
    value
        .parse::<Amount>()
        .map_err(|source| CommandParseError::InvalidAmount {
            value: value.to_string(),
            context,
            source,
        })
}
