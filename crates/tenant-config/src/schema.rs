//! Per-consumer decode schemas.
//!
//! Each consumer application recognizes its own whitelist of setting names;
//! anything else in a config row is dropped on decode. The schemas are an
//! explicit enum so callers always get a typed settings struct back.

/// The consumer schemas known to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// External identity provider credentials and flow settings.
    IdentityProvider,
    /// Tabular analytics store sink.
    AnalyticsStore,
    /// Email marketing platform sink.
    MarketingPlatform,
}

impl SchemaKind {
    /// The app id whose config rows this schema decodes.
    pub fn app_id(&self) -> &'static str {
        match self {
            SchemaKind::IdentityProvider => crate::IDENTITY_PROVIDER_APP,
            SchemaKind::AnalyticsStore => crate::ANALYTICS_STORE_APP,
            SchemaKind::MarketingPlatform => crate::MARKETING_PLATFORM_APP,
        }
    }
}

/// A decoded config, tagged by consumer schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedConfig {
    /// Identity-provider settings.
    IdentityProvider(IdentityProviderSettings),
    /// Analytics store settings.
    AnalyticsStore(AnalyticsStoreSettings),
    /// Marketing platform settings.
    MarketingPlatform(MarketingPlatformSettings),
}

/// Assigns recognized setting names to typed fields.
pub(crate) trait SettingsSchema: Default {
    /// Assign a decrypted value to the field named by `name`. Returns false
    /// for names the schema does not recognize.
    fn assign(&mut self, name: &str, value: String) -> bool;
}

/// Identity-provider consumer settings.
///
/// Absent configuration decodes to the all-`None` struct; callers branch on
/// `is_empty` rather than handling an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityProviderSettings {
    pub website: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub owner_id: Option<String>,
    pub owner_secret: Option<String>,
    pub flow: Option<String>,
    pub flow_version: Option<String>,
    pub password_reset_url: Option<String>,
    pub email_verify_url: Option<String>,
    pub entity: Option<String>,
}

impl IdentityProviderSettings {
    /// True when no setting was present for the key.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl SettingsSchema for IdentityProviderSettings {
    fn assign(&mut self, name: &str, value: String) -> bool {
        let field = match name {
            "website" => &mut self.website,
            "clientId" => &mut self.client_id,
            "clientSecret" => &mut self.client_secret,
            "ownerId" => &mut self.owner_id,
            "ownerSecret" => &mut self.owner_secret,
            "flow" => &mut self.flow,
            "flowVersion" => &mut self.flow_version,
            "passwordResetURL" => &mut self.password_reset_url,
            "emailVerifyURL" => &mut self.email_verify_url,
            "entity" => &mut self.entity,
            _ => return false,
        };
        *field = Some(value);
        true
    }
}

/// Analytics store sink settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsStoreSettings {
    pub db_name: Option<String>,
    pub table_name: Option<String>,
    pub base_uri: Option<String>,
    pub write_key: Option<String>,
}

impl AnalyticsStoreSettings {
    /// True when no setting was present for the key.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl SettingsSchema for AnalyticsStoreSettings {
    fn assign(&mut self, name: &str, value: String) -> bool {
        let field = match name {
            "dbName" => &mut self.db_name,
            "tableName" => &mut self.table_name,
            "baseUri" => &mut self.base_uri,
            "writeKey" => &mut self.write_key,
            _ => return false,
        };
        *field = Some(value);
        true
    }
}

/// Marketing platform sink settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketingPlatformSettings {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

impl MarketingPlatformSettings {
    /// True when no setting was present for the key.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl SettingsSchema for MarketingPlatformSettings {
    fn assign(&mut self, name: &str, value: String) -> bool {
        let field = match name {
            "apiKey" => &mut self.api_key,
            "apiUrl" => &mut self.api_url,
            _ => return false,
        };
        *field = Some(value);
        true
    }
}
