//! Identity provider profile types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tenant context for a profile lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tenant {
    /// Brand component of the tenant key.
    pub brand_id: String,
    /// Region component of the tenant key.
    pub region_id: String,
    /// Market within the tenant, when the caller knows it. Falls back to
    /// the region for config addressing.
    pub market_id: Option<String>,
    /// Locale for config addressing. Falls back to the client default.
    pub locale: Option<String>,
}

impl Tenant {
    /// Tenant with just brand and region.
    pub fn new(brand_id: &str, region_id: &str) -> Self {
        Self {
            brand_id: brand_id.to_string(),
            region_id: region_id.to_string(),
            ..Default::default()
        }
    }
}

/// A profile as the identity provider returns it.
///
/// The provider's field set is open-ended, so everything beyond the account
/// uuid is kept as a raw JSON map for downstream merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// The provider-issued account uuid the profile was fetched by.
    pub uid: String,
    /// Profile fields as returned by the provider.
    pub fields: Map<String, Value>,
}

impl Profile {
    /// Build a profile from a provider response body.
    pub fn from_body(uid: &str, body: Value) -> Self {
        let fields = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            uid: uid.to_string(),
            fields,
        }
    }

    /// Read one field as a string, if present.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
