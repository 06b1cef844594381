//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Selector for a global identity in tenant-scoped lookups.
///
/// The MUUID is used when known; otherwise the identity-provider account
/// uuid for the tenant is the fallback key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySelector {
    /// Global identity identifier.
    Muuid(String),
    /// Identity-provider account uuid (tenant-scoped).
    AccountUuid(String),
}

impl IdentitySelector {
    /// The raw key value, whichever variant it is.
    pub fn value(&self) -> &str {
        match self {
            IdentitySelector::Muuid(v) | IdentitySelector::AccountUuid(v) => v,
        }
    }
}

/// One entry in a global identity's email history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EmailRecord {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Global identity identifier.
    pub muuid: String,
    /// Email address. Globally unique across identities.
    pub email: String,
    /// 1-based position in the history; the highest position is current.
    pub position: i64,
    /// Creation timestamp.
    pub created_at: String,
}

/// Result of resolving a local account uuid back to its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AccountIdentity {
    /// Global identity identifier.
    pub muuid: String,
    /// Current email (highest history position).
    pub email: String,
    /// Brand of the tenant the account belongs to.
    pub brand_id: String,
    /// Region of the tenant the account belongs to.
    pub region_id: String,
}

/// An identity-provider account bound to one (brand, region) tenant.
///
/// List-valued fields (`tool_usage`, `shop`, `retailers`) are stored as JSON
/// array text; use the accessor methods to read them as lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LocalAccount {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Global identity identifier, if known at creation.
    pub muuid: Option<String>,
    /// Brand component of the tenant key. Frozen at creation.
    pub brand_id: String,
    /// Region component of the tenant key. Frozen at creation.
    pub region_id: String,
    /// Identity-provider account uuid.
    pub uuid: Option<String>,
    /// Product-usage aggregate (JSON array text).
    pub tool_usage: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// Acquisition source.
    pub source: Option<String>,
    /// Account type (e.g. "professional", "consumer").
    pub account_type: Option<String>,
    /// Shops the user buys from (JSON array text).
    pub shop: Option<String>,
    /// Retailers the user buys from (JSON array text).
    pub retailers: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl LocalAccount {
    /// Product-usage aggregate as a list.
    pub fn tool_usage_list(&self) -> Vec<String> {
        parse_string_list(self.tool_usage.as_deref())
    }

    /// Shops as a list.
    pub fn shop_list(&self) -> Vec<String> {
        parse_string_list(self.shop.as_deref())
    }

    /// Retailers as a list.
    pub fn retailers_list(&self) -> Vec<String> {
        parse_string_list(self.retailers.as_deref())
    }
}

/// Input for a local account upsert.
///
/// `muuid`, `brand_id` and `region_id` are set-on-insert; everything else
/// overwrites the stored row on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalAccountUpsert {
    /// Global identity identifier, if known.
    pub muuid: Option<String>,
    /// Brand component of the tenant key.
    pub brand_id: String,
    /// Region component of the tenant key.
    pub region_id: String,
    /// Identity-provider account uuid.
    pub uuid: Option<String>,
    /// Product-usage aggregate.
    pub tool_usage: Vec<String>,
    /// Company name.
    pub company: Option<String>,
    /// Acquisition source.
    pub source: Option<String>,
    /// Account type.
    pub account_type: Option<String>,
    /// Shops the user buys from.
    pub shop: Vec<String>,
    /// Retailers the user buys from.
    pub retailers: Vec<String>,
}

/// Marketing/consent state for one tenant, optionally scoped by market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PreferenceRecord {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Global identity identifier, if known.
    pub muuid: Option<String>,
    /// Identity-provider account uuid, if the MUUID is not known.
    pub uuid: Option<String>,
    /// Brand component of the tenant key.
    pub brand_id: String,
    /// Region component of the tenant key.
    pub region_id: String,
    /// Market scope within the tenant, if any.
    pub market_id: Option<String>,
    /// Email marketing consent.
    pub email_opt_in: Option<bool>,
    /// SMS marketing consent.
    pub sms_opt_in: Option<bool>,
    /// When the email consent was given.
    pub email_opt_in_date: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Display handle.
    pub user_name: Option<String>,
    /// Preferred language.
    pub language: Option<String>,
    /// Trades the user works in (JSON array text).
    pub demographic_trades: Option<String>,
    /// Interest tags (JSON array text).
    pub interests: Option<String>,
    /// Set when the write originated from the identity-resolution side;
    /// suppresses the downstream sync trigger.
    pub from_identity_core: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl PreferenceRecord {
    /// Trades as a list.
    pub fn demographic_trades_list(&self) -> Vec<String> {
        parse_string_list(self.demographic_trades.as_deref())
    }

    /// Interests as a list.
    pub fn interests_list(&self) -> Vec<String> {
        parse_string_list(self.interests.as_deref())
    }
}

/// Input for a preference upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceUpsert {
    /// Global identity identifier, if known.
    pub muuid: Option<String>,
    /// Identity-provider account uuid, if the MUUID is not known.
    pub uuid: Option<String>,
    /// Brand component of the tenant key.
    pub brand_id: String,
    /// Region component of the tenant key.
    pub region_id: String,
    /// Market scope within the tenant, if any.
    pub market_id: Option<String>,
    /// Email marketing consent.
    pub email_opt_in: Option<bool>,
    /// SMS marketing consent.
    pub sms_opt_in: Option<bool>,
    /// When the email consent was given.
    pub email_opt_in_date: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Display handle.
    pub user_name: Option<String>,
    /// Preferred language.
    pub language: Option<String>,
    /// Trades the user works in.
    pub demographic_trades: Vec<String>,
    /// Interest tags.
    pub interests: Vec<String>,
    /// Whether the write originated from the identity-resolution side.
    pub from_identity_core: bool,
}

/// One named setting inside a tenant config row. The value is encrypted at
/// rest; decryption happens in the config cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    /// Setting name, matched against the consumer's schema.
    pub name: String,
    /// Encrypted, base64-encoded value.
    pub value: String,
}

/// A stored tenant configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TenantConfigRow {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Consumer application identifier.
    pub app_id: String,
    /// Brand component of the composite key.
    pub brand_id: String,
    /// Region component of the composite key.
    pub region_id: String,
    /// Market component; required for the identity-provider consumer.
    pub market_id: Option<String>,
    /// Locale component; required for the identity-provider consumer.
    pub locale: Option<String>,
    /// Optional group component.
    pub group_id: Option<String>,
    /// JSON list of encrypted settings.
    pub settings: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl TenantConfigRow {
    /// Decode the settings column. Malformed JSON yields an empty list.
    pub fn settings_list(&self) -> Vec<Setting> {
        serde_json::from_str(&self.settings).unwrap_or_default()
    }
}

/// Input for a tenant config upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantConfigUpsert {
    /// Consumer application identifier.
    pub app_id: String,
    /// Brand component of the composite key.
    pub brand_id: String,
    /// Region component of the composite key.
    pub region_id: String,
    /// Market component, if the consumer keys on it.
    pub market_id: Option<String>,
    /// Locale component, if the consumer keys on it.
    pub locale: Option<String>,
    /// Optional group component.
    pub group_id: Option<String>,
    /// Encrypted settings to store.
    pub settings: Vec<Setting>,
}

/// Parse a JSON array column into a list, tolerating NULL and bad data.
pub(crate) fn parse_string_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default()
}

/// Serialize a list for storage in a JSON array column. Empty lists are
/// stored as NULL so unset and empty are indistinguishable on read.
pub(crate) fn encode_string_list(list: &[String]) -> Option<String> {
    if list.is_empty() {
        None
    } else {
        serde_json::to_string(list).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_list_round_trip() {
        let list = vec!["drill".to_string(), "saw".to_string()];
        let encoded = encode_string_list(&list).unwrap();
        assert_eq!(parse_string_list(Some(&encoded)), list);
    }

    #[test]
    fn test_string_list_tolerates_bad_data() {
        assert!(parse_string_list(None).is_empty());
        assert!(parse_string_list(Some("not json")).is_empty());
        assert!(encode_string_list(&[]).is_none());
    }

    #[test]
    fn test_selector_value() {
        assert_eq!(IdentitySelector::Muuid("m1".into()).value(), "m1");
        assert_eq!(IdentitySelector::AccountUuid("u1".into()).value(), "u1");
    }
}
