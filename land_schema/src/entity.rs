//! Inbound entity-change records as delivered by the indexer.
//!
//! One update names a hashed entity id and carries, per namespace, the full
//! field set of every model that changed for that entity. The three land
//! models share the same location key but travel independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type FieldMap = Map<String, Value>;

/// Ledger model kinds the land grid listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    Land,
    LandStake,
    Auction,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Land, ModelKind::LandStake, ModelKind::Auction];

    pub fn model_name(self) -> &'static str {
        match self {
            ModelKind::Land => "Land",
            ModelKind::LandStake => "LandStake",
            ModelKind::Auction => "Auction",
        }
    }

    /// Field holding the location key for this model.
    pub fn location_field(self) -> &'static str {
        match self {
            ModelKind::Land | ModelKind::LandStake => "location",
            ModelKind::Auction => "land_location",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityUpdate {
    #[serde(rename = "entityId", alias = "entity_id", default)]
    pub entity_id: String,
    #[serde(default)]
    pub models: BTreeMap<String, BTreeMap<String, FieldMap>>,
}

impl EntityUpdate {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            models: BTreeMap::new(),
        }
    }

    /// Attaches the full field set of one model. Passing an empty map marks
    /// the model as deleted.
    pub fn with_model(mut self, namespace: &str, kind: ModelKind, fields: FieldMap) -> Self {
        self.models
            .entry(namespace.to_string())
            .or_default()
            .insert(kind.model_name().to_string(), fields);
        self
    }

    pub fn model(&self, namespace: &str, kind: ModelKind) -> Option<&FieldMap> {
        self.models
            .get(namespace)
            .and_then(|models| models.get(kind.model_name()))
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.models.contains_key(namespace)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

/// Builds a field map from a JSON object literal; anything else yields an
/// empty map.
pub fn fields(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        _ => FieldMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_indexer_payload() {
        let raw = r#"{
            "entityId": "0x01ab",
            "models": {
                "ponzi_land": {
                    "LandStake": { "location": 4, "amount": "0x1f4", "last_pay_time": 10 }
                }
            }
        }"#;
        let update: EntityUpdate = serde_json::from_str(raw).unwrap();
        assert_eq!(update.entity_id, "0x01ab");
        let stake = update
            .model("ponzi_land", ModelKind::LandStake)
            .expect("stake model present");
        assert_eq!(stake.get("amount"), Some(&json!("0x1f4")));
        assert!(update.model("ponzi_land", ModelKind::Land).is_none());
        assert!(update.model("other", ModelKind::LandStake).is_none());
    }

    #[test]
    fn builder_groups_models_by_namespace() {
        let update = EntityUpdate::new("0x1")
            .with_model("ponzi_land", ModelKind::Land, fields(json!({ "location": 1 })))
            .with_model("ponzi_land", ModelKind::Auction, fields(json!({})));
        assert_eq!(update.namespaces().collect::<Vec<_>>(), vec!["ponzi_land"]);
        assert!(update
            .model("ponzi_land", ModelKind::Auction)
            .is_some_and(|fields| fields.is_empty()));
    }
}
