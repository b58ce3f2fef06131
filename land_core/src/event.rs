//! Decoding of indexer updates into typed land events.

use land_schema::{
    bool_from_value, u64_from_value, Amount, EntityUpdate, Felt, FieldMap, ModelKind, ValueError,
};
use serde_json::Value;
use thiserror::Error;

use crate::cell::Level;
use crate::location::Location;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("update carries no models under namespace '{namespace}'")]
    ForeignNamespace { namespace: String },
    #[error("update carries no land, stake or auction model")]
    NoLandModels,
    #[error("{model} is missing field '{field}'")]
    MissingField {
        model: &'static str,
        field: &'static str,
    },
    #[error("{model}.{field} is invalid: {source}")]
    InvalidField {
        model: &'static str,
        field: &'static str,
        #[source]
        source: ValueError,
    },
    #[error("level '{value}' is not a known level")]
    UnknownLevel { value: String },
    #[error("models disagree on location: {first} vs {second}")]
    ConflictingLocations { first: Location, second: Location },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandRecord {
    pub location: Location,
    pub owner: Felt,
    pub block_date_bought: u64,
    pub sell_price: Amount,
    pub token_used: Felt,
    pub level: Level,
}

impl LandRecord {
    /// The ledger zeroes a land record when the land is removed.
    pub fn is_zeroed(&self) -> bool {
        self.owner.is_zero()
            && self.token_used.is_zero()
            && self.sell_price.is_zero()
            && self.block_date_bought == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeRecord {
    pub location: Location,
    pub amount: Amount,
    pub last_pay_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionRecord {
    pub location: Location,
    pub start_time: u64,
    pub start_price: Amount,
    pub floor_price: Amount,
    pub decay_rate: u64,
    pub is_finished: bool,
    pub sold_at_price: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandPayload {
    /// Empty or zeroed land model.
    Deleted,
    Record(LandRecord),
}

/// One decoded update. Every model present agrees on `location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandEvent {
    pub entity_id: String,
    pub location: Option<Location>,
    pub land: Option<LandPayload>,
    pub stake: Option<StakeRecord>,
    pub auction: Option<AuctionRecord>,
}

impl LandEvent {
    pub fn is_deletion(&self) -> bool {
        matches!(self.land, Some(LandPayload::Deleted))
    }

    pub fn land_record(&self) -> Option<&LandRecord> {
        match &self.land {
            Some(LandPayload::Record(record)) => Some(record),
            _ => None,
        }
    }

    /// Carries nothing the merge could act on.
    pub fn is_noop(&self) -> bool {
        self.land.is_none() && self.stake.is_none() && self.auction.is_none()
    }
}

pub fn decode_update(update: &EntityUpdate, namespace: &str) -> Result<LandEvent, DecodeError> {
    if !update.has_namespace(namespace) {
        return Err(DecodeError::ForeignNamespace {
            namespace: namespace.to_string(),
        });
    }

    let land_fields = update.model(namespace, ModelKind::Land);
    let stake_fields = update.model(namespace, ModelKind::LandStake);
    let auction_fields = update.model(namespace, ModelKind::Auction);
    if land_fields.is_none() && stake_fields.is_none() && auction_fields.is_none() {
        return Err(DecodeError::NoLandModels);
    }

    let mut location = LocationVote::default();

    let land = match land_fields {
        None => None,
        Some(fields) if fields.is_empty() => Some(LandPayload::Deleted),
        Some(fields) => {
            let record = decode_land(fields)?;
            location.cast(record.location)?;
            if record.is_zeroed() {
                Some(LandPayload::Deleted)
            } else {
                Some(LandPayload::Record(record))
            }
        }
    };

    // An emptied stake or auction model carries nothing to merge.
    let stake = match stake_fields.filter(|fields| !fields.is_empty()) {
        Some(fields) => {
            let record = decode_stake(fields)?;
            location.cast(record.location)?;
            Some(record)
        }
        None => None,
    };

    let auction = match auction_fields.filter(|fields| !fields.is_empty()) {
        Some(fields) => {
            let record = decode_auction(fields)?;
            location.cast(record.location)?;
            Some(record)
        }
        None => None,
    };

    Ok(LandEvent {
        entity_id: update.entity_id.clone(),
        location: location.0,
        land,
        stake,
        auction,
    })
}

#[derive(Default)]
struct LocationVote(Option<Location>);

impl LocationVote {
    fn cast(&mut self, candidate: Location) -> Result<(), DecodeError> {
        match self.0 {
            Some(first) if first != candidate => Err(DecodeError::ConflictingLocations {
                first,
                second: candidate,
            }),
            _ => {
                self.0 = Some(candidate);
                Ok(())
            }
        }
    }
}

fn decode_land(fields: &FieldMap) -> Result<LandRecord, DecodeError> {
    let model = ModelKind::Land.model_name();
    Ok(LandRecord {
        location: field(fields, model, "location", Location::from_value)?,
        owner: field(fields, model, "owner", Felt::from_value)?,
        block_date_bought: field(fields, model, "block_date_bought", u64_from_value)?,
        sell_price: field(fields, model, "sell_price", Amount::from_value)?,
        token_used: field(fields, model, "token_used", Felt::from_value)?,
        level: decode_level(required(fields, model, "level")?)?,
    })
}

fn decode_stake(fields: &FieldMap) -> Result<StakeRecord, DecodeError> {
    let model = ModelKind::LandStake.model_name();
    Ok(StakeRecord {
        location: field(fields, model, "location", Location::from_value)?,
        amount: field(fields, model, "amount", Amount::from_value)?,
        last_pay_time: field(fields, model, "last_pay_time", u64_from_value)?,
    })
}

fn decode_auction(fields: &FieldMap) -> Result<AuctionRecord, DecodeError> {
    let model = ModelKind::Auction.model_name();
    let sold_at_price = decode_optional_amount(fields.get("sold_at_price")).map_err(|source| {
        DecodeError::InvalidField {
            model,
            field: "sold_at_price",
            source,
        }
    })?;
    Ok(AuctionRecord {
        location: field(fields, model, "land_location", Location::from_value)?,
        start_time: field(fields, model, "start_time", u64_from_value)?,
        start_price: field(fields, model, "start_price", Amount::from_value)?,
        floor_price: field(fields, model, "floor_price", Amount::from_value)?,
        decay_rate: field(fields, model, "decay_rate", u64_from_value)?,
        is_finished: field(fields, model, "is_finished", bool_from_value)?,
        sold_at_price,
    })
}

fn required<'a>(
    fields: &'a FieldMap,
    model: &'static str,
    name: &'static str,
) -> Result<&'a Value, DecodeError> {
    fields
        .get(name)
        .ok_or(DecodeError::MissingField { model, field: name })
}

fn field<T>(
    fields: &FieldMap,
    model: &'static str,
    name: &'static str,
    parse: impl FnOnce(&Value) -> Result<T, ValueError>,
) -> Result<T, DecodeError> {
    let value = required(fields, model, name)?;
    parse(value).map_err(|source| DecodeError::InvalidField {
        model,
        field: name,
        source,
    })
}

/// Levels arrive as a bare variant name, a single-key enum object
/// (`{"First": []}`) or a variant index.
fn decode_level(value: &Value) -> Result<Level, DecodeError> {
    let unknown = || DecodeError::UnknownLevel {
        value: value.to_string(),
    };
    match value {
        Value::String(name) => Level::from_variant(name)
            .or_else(|| {
                u64_from_value(value)
                    .ok()
                    .and_then(Level::from_index)
            })
            .ok_or_else(unknown),
        Value::Object(map) if map.len() == 1 => map
            .keys()
            .next()
            .and_then(|name| Level::from_variant(name))
            .ok_or_else(unknown),
        Value::Number(number) => number
            .as_u64()
            .and_then(Level::from_index)
            .ok_or_else(unknown),
        _ => Err(unknown()),
    }
}

/// Ledger options arrive as `{"Some": v}` / `{"None": ..}`, null, or a bare value.
fn decode_optional_amount(value: Option<&Value>) -> Result<Option<Amount>, ValueError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => {
            if let Some(inner) = map.get("Some") {
                Amount::from_value(inner).map(Some)
            } else if map.contains_key("None") {
                Ok(None)
            } else {
                Err(ValueError::NotNumeric(Value::Object(map.clone()).to_string()))
            }
        }
        Some(other) => Amount::from_value(other).map(Some),
    }
}
