//! Per-cell land model.
//!
//! A cell is always exactly one of three variants. The location is fixed when
//! the grid is built; merges only ever swap the variant payload.

use land_schema::{Amount, CellKind, Felt};
use serde::{Deserialize, Serialize};

use crate::event::{AuctionRecord, LandRecord, StakeRecord};
use crate::grid::GridError;
use crate::location::Location;
use crate::tokens::{TokenRef, TokenTable};

/// Building level as the contracts name it. `Zero` is displayed as level 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Level {
    #[default]
    Zero,
    First,
    Second,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Zero, Level::First, Level::Second];

    pub fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Level::Zero),
            1 => Some(Level::First),
            2 => Some(Level::Second),
            _ => None,
        }
    }

    pub fn from_variant(name: &str) -> Option<Self> {
        match name {
            "Zero" => Some(Level::Zero),
            "First" => Some(Level::First),
            "Second" => Some(Level::Second),
            _ => None,
        }
    }

    pub fn variant_name(self) -> &'static str {
        match self {
            Level::Zero => "Zero",
            Level::First => "First",
            Level::Second => "Second",
        }
    }

    pub fn display_level(self) -> u8 {
        match self {
            Level::Zero => 1,
            Level::First => 2,
            Level::Second => 3,
        }
    }

    pub fn from_display(level: u8) -> Option<Self> {
        level.checked_sub(1).and_then(|index| Level::from_index(u64::from(index)))
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Level::Zero => Some(Level::First),
            Level::First => Some(Level::Second),
            Level::Second => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stake {
    pub amount: Amount,
    pub last_pay_time: u64,
}

impl From<&StakeRecord> for Stake {
    fn from(record: &StakeRecord) -> Self {
        Self {
            amount: record.amount,
            last_pay_time: record.last_pay_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingLand {
    pub owner: Felt,
    pub bought_at: u64,
    pub level: Level,
    pub sell_price: Amount,
    pub token: TokenRef,
    pub stake: Stake,
}

impl BuildingLand {
    fn from_record(record: &LandRecord, tokens: &TokenTable) -> Self {
        Self {
            owner: record.owner,
            bought_at: record.block_date_bought,
            level: record.level,
            sell_price: record.sell_price,
            token: tokens.resolve(record.token_used),
            stake: Stake::default(),
        }
    }

    fn update(&mut self, record: &LandRecord, tokens: &TokenTable) {
        self.owner = record.owner;
        self.bought_at = record.block_date_bought;
        self.level = record.level;
        self.sell_price = record.sell_price;
        if self.token.address() != record.token_used {
            self.token = tokens.resolve(record.token_used);
        }
    }
}

/// Auction parameters together with whatever land record accompanied them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionLand {
    pub owner: Felt,
    pub bought_at: u64,
    pub level: Level,
    pub sell_price: Amount,
    pub token: Option<TokenRef>,
    pub start_time: u64,
    pub start_price: Amount,
    pub floor_price: Amount,
    pub decay_rate: u64,
    pub is_finished: bool,
    pub sold_at_price: Option<Amount>,
}

impl AuctionLand {
    fn from_record(auction: &AuctionRecord) -> Self {
        Self {
            owner: Felt::ZERO,
            bought_at: 0,
            level: Level::Zero,
            sell_price: Amount::ZERO,
            token: None,
            start_time: auction.start_time,
            start_price: auction.start_price,
            floor_price: auction.floor_price,
            decay_rate: auction.decay_rate,
            is_finished: auction.is_finished,
            sold_at_price: auction.sold_at_price,
        }
    }

    fn update_auction(&mut self, auction: &AuctionRecord) {
        self.start_time = auction.start_time;
        self.start_price = auction.start_price;
        self.floor_price = auction.floor_price;
        self.decay_rate = auction.decay_rate;
        self.is_finished = auction.is_finished;
        self.sold_at_price = auction.sold_at_price;
    }

    fn absorb_land(&mut self, record: &LandRecord, tokens: &TokenTable) {
        self.owner = record.owner;
        self.bought_at = record.block_date_bought;
        self.level = record.level;
        self.sell_price = record.sell_price;
        self.token = (!record.token_used.is_zero()).then(|| tokens.resolve(record.token_used));
    }

    pub fn is_owned(&self) -> bool {
        !self.owner.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LandState {
    #[default]
    Empty,
    Auction(AuctionLand),
    Building(BuildingLand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandCell {
    location: Location,
    state: LandState,
}

impl LandCell {
    pub fn empty(location: Location) -> Self {
        Self {
            location,
            state: LandState::Empty,
        }
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.location
    }

    #[inline]
    pub fn state(&self) -> &LandState {
        &self.state
    }

    pub fn kind(&self) -> CellKind {
        match self.state {
            LandState::Empty => CellKind::Empty,
            LandState::Auction(_) => CellKind::Auction,
            LandState::Building(_) => CellKind::Building,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, LandState::Empty)
    }

    pub fn as_building(&self) -> Option<&BuildingLand> {
        match &self.state {
            LandState::Building(building) => Some(building),
            _ => None,
        }
    }

    pub fn as_auction(&self) -> Option<&AuctionLand> {
        match &self.state {
            LandState::Auction(auction) => Some(auction),
            _ => None,
        }
    }

    /// Non-zero owner, if any.
    pub fn owner(&self) -> Option<Felt> {
        let owner = match &self.state {
            LandState::Empty => return None,
            LandState::Auction(auction) => auction.owner,
            LandState::Building(building) => building.owner,
        };
        (!owner.is_zero()).then_some(owner)
    }

    /// Counts toward a neighbor's yield and tax.
    pub fn is_live(&self) -> bool {
        self.owner().is_some()
    }

    pub fn level(&self) -> Option<Level> {
        match &self.state {
            LandState::Empty => None,
            LandState::Auction(auction) => Some(auction.level),
            LandState::Building(building) => Some(building.level),
        }
    }

    pub fn sell_price(&self) -> Amount {
        match &self.state {
            LandState::Empty => Amount::ZERO,
            LandState::Auction(auction) => auction.sell_price,
            LandState::Building(building) => building.sell_price,
        }
    }

    pub fn token(&self) -> Option<&TokenRef> {
        match &self.state {
            LandState::Empty => None,
            LandState::Auction(auction) => auction.token.as_ref(),
            LandState::Building(building) => Some(&building.token),
        }
    }

    pub fn stake(&self) -> Option<Stake> {
        self.as_building().map(|building| building.stake)
    }

    fn check_location(&self, payload: Location) -> Result<(), GridError> {
        if payload == self.location {
            Ok(())
        } else {
            Err(GridError::LocationMismatch {
                cell: self.location,
                payload,
            })
        }
    }

    pub(crate) fn clear(&mut self) {
        self.state = LandState::Empty;
    }

    /// Updates an existing building in place or replaces the cell with a new
    /// one. An auction cell loses its auction parameters.
    pub(crate) fn put_building(
        &mut self,
        record: &LandRecord,
        tokens: &TokenTable,
    ) -> Result<(), GridError> {
        self.check_location(record.location)?;
        match &mut self.state {
            LandState::Building(building) => building.update(record, tokens),
            _ => self.state = LandState::Building(BuildingLand::from_record(record, tokens)),
        }
        Ok(())
    }

    /// Updates an existing auction in place or replaces the cell with a new
    /// one, folding in a land record from the same event when present.
    pub(crate) fn put_auction(
        &mut self,
        auction: &AuctionRecord,
        land: Option<&LandRecord>,
        tokens: &TokenTable,
    ) -> Result<(), GridError> {
        self.check_location(auction.location)?;
        if let Some(record) = land {
            self.check_location(record.location)?;
        }
        match &mut self.state {
            LandState::Auction(existing) => existing.update_auction(auction),
            _ => self.state = LandState::Auction(AuctionLand::from_record(auction)),
        }
        if let (LandState::Auction(existing), Some(record)) = (&mut self.state, land) {
            existing.absorb_land(record, tokens);
        }
        Ok(())
    }

    /// Applies a stake to a building. Returns `false` when the cell holds no
    /// building and the stake must wait.
    pub(crate) fn put_stake(&mut self, location: Location, stake: Stake) -> Result<bool, GridError> {
        self.check_location(location)?;
        match &mut self.state {
            LandState::Building(building) => {
                building.stake = stake;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
