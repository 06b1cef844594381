//! Composite cache keys.
//!
//! Cached configuration is addressed by the serialized
//! `(app, brand, region, market?, locale?, group?)` tuple. The
//! identity-provider consumer keys on market and locale as well; every
//! other consumer keys on `(app, brand, region, group?)`.

use database::TenantConfigRow;

/// Composite key addressing one cached tenant config.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    /// Consumer application identifier.
    pub app_id: String,
    /// Brand component.
    pub brand_id: String,
    /// Region component.
    pub region_id: String,
    /// Market component (identity-provider shape only).
    pub market_id: Option<String>,
    /// Locale component (identity-provider shape only).
    pub locale: Option<String>,
    /// Optional group component, valid for every shape.
    pub group_id: Option<String>,
}

impl CompositeKey {
    /// Key shape used by the identity-provider consumer: market and locale
    /// are part of the key.
    pub fn identity_provider(
        brand_id: &str,
        region_id: &str,
        market_id: &str,
        locale: &str,
        group_id: Option<&str>,
    ) -> Self {
        Self {
            app_id: crate::IDENTITY_PROVIDER_APP.to_string(),
            brand_id: brand_id.to_string(),
            region_id: region_id.to_string(),
            market_id: Some(market_id.to_string()),
            locale: Some(locale.to_string()),
            group_id: group_id.map(str::to_string),
        }
    }

    /// Key shape used by every other consumer.
    pub fn consumer(app_id: &str, brand_id: &str, region_id: &str, group_id: Option<&str>) -> Self {
        Self {
            app_id: app_id.to_string(),
            brand_id: brand_id.to_string(),
            region_id: region_id.to_string(),
            market_id: None,
            locale: None,
            group_id: group_id.map(str::to_string),
        }
    }

    /// Rebuild the key a stored config row is cached under.
    pub fn from_row(row: &TenantConfigRow) -> Self {
        Self {
            app_id: row.app_id.clone(),
            brand_id: row.brand_id.clone(),
            region_id: row.region_id.clone(),
            market_id: row.market_id.clone(),
            locale: row.locale.clone(),
            group_id: row.group_id.clone(),
        }
    }

    /// Canonical string form: six segments, empty where a component is
    /// unset, so every shape serializes unambiguously.
    pub fn serialize(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.app_id,
            self.brand_id,
            self.region_id,
            self.market_id.as_deref().unwrap_or(""),
            self.locale.as_deref().unwrap_or(""),
            self.group_id.as_deref().unwrap_or(""),
        )
    }

    /// The app segment of a serialized key.
    pub(crate) fn app_of_serialized(serialized: &str) -> &str {
        serialized.split(':').next().unwrap_or("")
    }
}
