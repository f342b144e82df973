//! Structured addresses and the debounced autocomplete in front of an
//! [`AddressLookup`] service.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ServiceError;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const MIN_QUERY_CHARS: usize = 3;

/// Suffixes of the flat keys stored next to an address answer.
pub const FLAT_PARTS: [&str; 6] = ["lat", "lng", "postal_code", "city", "region", "country"];

static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{3}\s?\d{2})\b\s*([^,\d][^,]*)?").expect("postal code regex")
});

/// Ranked suggestion returned by a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressCandidate {
    pub label: String,
    pub lat: f64,
    pub lng: f64,
}

/// Geocoding backend.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<AddressCandidate>, ServiceError>;

    /// Raw reverse-geocoding response, if the backend has one.
    async fn reverse(&self, lat: f64, lng: f64) -> Result<Option<Value>, ServiceError>;
}

/// Address answer; every part except `value` is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            value: text.into(),
            ..Self::default()
        }
    }

    /// Reads an incoming answer: plain text or an object using common key aliases.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::from_text(text.clone())),
            Value::Object(map) => Some(Self::from_object(map)),
            _ => None,
        }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        Self {
            value: text_of(map, &["value", "label", "display_name", "name"]).unwrap_or_default(),
            lat: number_of(map, &["lat", "latitude"]),
            lng: number_of(map, &["lng", "lon", "longitude"]),
            postal_code: text_of(map, &["postal_code", "postcode", "zip"]),
            city: text_of(map, &["city", "town", "village", "municipality"]),
            region: text_of(map, &["region", "state", "county"]),
            country: text_of(map, &["country"]),
        }
    }

    /// Parses a reverse-geocoding response.
    ///
    /// Tries flat keys, a nested `address` object, a `regionalStructure`
    /// list, and finally a postal code scraped from the display label.
    pub fn from_reverse(response: &Value) -> Self {
        let Some(root) = response.as_object() else {
            return Self::default();
        };
        let mut address = Self::from_object(root);

        if let Some(nested) = root.get("address").and_then(Value::as_object) {
            address.fill_from(Self::from_object(nested));
        }

        if let Some(structure) = root.get("regionalStructure").and_then(Value::as_array) {
            address.fill_from(Self::from_regional_structure(structure));
        }

        if address.postal_code.is_none() || address.city.is_none() {
            let label = text_of(root, &["display_name", "label", "name", "value"]);
            if let Some(captures) = label.as_deref().and_then(|label| POSTAL_CODE.captures(label)) {
                if address.postal_code.is_none() {
                    address.postal_code = captures.get(1).map(|m| m.as_str().to_string());
                }
                if address.city.is_none() {
                    address.city = captures
                        .get(2)
                        .map(|m| m.as_str().trim().to_string())
                        .filter(|city| !city.is_empty());
                }
            }
        }

        address
    }

    fn from_regional_structure(items: &[Value]) -> Self {
        let mut address = Self::default();
        for item in items {
            let name = item.get("name").and_then(Value::as_str).map(String::from);
            match item.get("type").and_then(Value::as_str) {
                Some("regional.municipality") => address.city = address.city.or(name),
                Some("regional.region") => address.region = address.region.or(name),
                Some("regional.country") => address.country = address.country.or(name),
                _ => {}
            }
        }
        address
    }

    /// Fills parts that are still missing from `other`.
    pub fn fill_from(&mut self, other: Address) {
        if self.value.is_empty() {
            self.value = other.value;
        }
        self.lat = self.lat.or(other.lat);
        self.lng = self.lng.or(other.lng);
        self.postal_code = self.postal_code.take().or(other.postal_code);
        self.city = self.city.take().or(other.city);
        self.region = self.region.take().or(other.region);
        self.country = self.country.take().or(other.country);
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Every `<field>_<part>` key [`flattened`](Self::flattened) may write.
    pub fn flat_keys(field_id: &str) -> Vec<String> {
        FLAT_PARTS
            .iter()
            .map(|part| format!("{field_id}_{part}"))
            .collect()
    }

    /// `<field>_<part>` backup keys for consumers that need flat coordinates.
    pub fn flattened(&self, field_id: &str) -> Vec<(String, Value)> {
        let values = [
            self.lat.map(Value::from),
            self.lng.map(Value::from),
            self.postal_code.clone().map(Value::String),
            self.city.clone().map(Value::String),
            self.region.clone().map(Value::String),
            self.country.clone().map(Value::String),
        ];
        FLAT_PARTS
            .iter()
            .zip(values)
            .filter_map(|(part, value)| Some((format!("{field_id}_{part}"), value?)))
            .collect()
    }
}

impl From<&AddressCandidate> for Address {
    fn from(candidate: &AddressCandidate) -> Self {
        Self {
            value: candidate.label.clone(),
            lat: Some(candidate.lat),
            lng: Some(candidate.lng),
            ..Self::default()
        }
    }
}

fn text_of(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .filter_map(|value| match value {
            Value::String(text) => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
        .find(|text| !text.is_empty())
}

fn number_of(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
}

/// Debounced, last-write-wins front for an [`AddressLookup`].
///
/// Every call to [`query`](Self::query) invalidates the calls before it; an
/// invalidated call returns `None` even if its lookup already resolved.
pub struct AddressAutocomplete<L> {
    lookup: L,
    debounce: Duration,
    generation: AtomicU64,
}

impl<L: AddressLookup> AddressAutocomplete<L> {
    pub fn new(lookup: L) -> Self {
        Self::with_debounce(lookup, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(lookup: L, debounce: Duration) -> Self {
        Self {
            lookup,
            debounce,
            generation: AtomicU64::new(0),
        }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Candidates for `text`, or `None` when a newer keystroke superseded it.
    pub async fn query(&self, text: &str) -> Option<Vec<AddressCandidate>> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let text = text.trim();
        if text.chars().count() < MIN_QUERY_CHARS {
            return Some(Vec::new());
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(ticket) {
            debug!(query = text, "address query superseded before lookup");
            return None;
        }

        let candidates = match self.lookup.search(text).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(query = text, error = %err, "address lookup failed");
                Vec::new()
            }
        };

        if !self.is_current(ticket) {
            debug!(query = text, "discarding stale address results");
            return None;
        }
        Some(candidates)
    }

    /// Builds an address from a picked candidate, enriched by reverse lookup
    /// when the backend cooperates.
    pub async fn enrich(&self, candidate: &AddressCandidate) -> Address {
        let mut address = Address::from(candidate);
        match self.lookup.reverse(candidate.lat, candidate.lng).await {
            Ok(Some(response)) => address.fill_from(Address::from_reverse(&response)),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "reverse geocoding failed"),
        }
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reverse_prefers_structured_keys() {
        let address = Address::from_reverse(&json!({
            "display_name": "Vodickova 1, 110 00 Praha",
            "address": { "postcode": "11000", "city": "Praha", "state": "Hlavni mesto Praha", "country": "Czechia" }
        }));
        assert_eq!(address.postal_code.as_deref(), Some("11000"));
        assert_eq!(address.city.as_deref(), Some("Praha"));
        assert_eq!(address.region.as_deref(), Some("Hlavni mesto Praha"));
    }

    #[test]
    fn reverse_reads_regional_structure() {
        let address = Address::from_reverse(&json!({
            "name": "Masarykova 5",
            "zip": "602 00",
            "regionalStructure": [
                { "name": "Brno", "type": "regional.municipality" },
                { "name": "Jihomoravsky kraj", "type": "regional.region" },
                { "name": "Cesko", "type": "regional.country" }
            ]
        }));
        assert_eq!(address.postal_code.as_deref(), Some("602 00"));
        assert_eq!(address.city.as_deref(), Some("Brno"));
        assert_eq!(address.country.as_deref(), Some("Cesko"));
    }

    #[test]
    fn reverse_falls_back_to_label() {
        let address = Address::from_reverse(&json!({ "label": "Na Prikope 12, 110 00 Praha 1" }));
        assert_eq!(address.postal_code.as_deref(), Some("110 00"));
        assert_eq!(address.city.as_deref(), Some("Praha 1"));
        assert!(address.region.is_none());
    }

    #[test]
    fn reverse_tolerates_garbage() {
        assert_eq!(Address::from_reverse(&json!(null)), Address::default());
        let address = Address::from_reverse(&json!({ "address": 7, "regionalStructure": "x" }));
        assert!(address.postal_code.is_none());
    }

    #[test]
    fn flattened_keys_follow_field_id() {
        let address = Address {
            value: "Praha".into(),
            lat: Some(50.08),
            lng: Some(14.42),
            postal_code: Some("110 00".into()),
            ..Address::default()
        };
        let keys = address
            .flattened("address")
            .into_iter()
            .map(|(key, _)| key)
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["address_lat", "address_lng", "address_postal_code"]);
    }

    #[test]
    fn flat_keys_cover_every_part() {
        let full = Address {
            value: "Praha".into(),
            lat: Some(50.08),
            lng: Some(14.42),
            postal_code: Some("110 00".into()),
            city: Some("Praha".into()),
            region: Some("Praha".into()),
            country: Some("Czechia".into()),
        };
        let written = full
            .flattened("address")
            .into_iter()
            .map(|(key, _)| key)
            .collect::<Vec<_>>();
        assert_eq!(written, Address::flat_keys("address"));
    }
}
