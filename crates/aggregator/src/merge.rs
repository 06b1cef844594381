//! Field mapping and layered merging for unified profiles.
//!
//! The downstream schema is a flat JSON object with camelCase names. A
//! profile is assembled in precedence layers (identity provider, then the
//! representative preference record, then caller overrides); each layer
//! only carries the fields it actually has, so a later layer never clobbers
//! an earlier one with an absent value.

use analytics_sync::RecordFields;
use database::{LocalAccount, PreferenceRecord};
use serde_json::Value;

/// Identity-scoped fields promoted to the profile root. Market entries are
/// stripped of these to avoid duplicating them per market.
const IDENTITY_FIELDS: &[&str] = &[
    "muuid",
    "uuid",
    "brandId",
    "regionId",
    "userName",
    "toolUsage",
    "interests",
    "demographicTrades",
    "trade",
];

/// Flatten a preference record (plus its tenant's local account, when
/// joined) into downstream-shaped fields.
pub(crate) fn record_fields(
    record: &PreferenceRecord,
    account: Option<&LocalAccount>,
) -> RecordFields {
    let mut fields = RecordFields::new();

    insert_str(&mut fields, "muuid", record.muuid.as_deref());
    insert_str(&mut fields, "uuid", record.uuid.as_deref());
    insert_str(&mut fields, "brandId", Some(&record.brand_id));
    insert_str(&mut fields, "regionId", Some(&record.region_id));
    insert_str(&mut fields, "marketId", record.market_id.as_deref());
    insert_bool(&mut fields, "emailOptIn", record.email_opt_in);
    insert_bool(&mut fields, "smsOptIn", record.sms_opt_in);
    insert_str(&mut fields, "emailOptInDate", record.email_opt_in_date.as_deref());
    insert_str(&mut fields, "firstName", record.first_name.as_deref());
    insert_str(&mut fields, "lastName", record.last_name.as_deref());
    insert_str(&mut fields, "userName", record.user_name.as_deref());
    insert_str(&mut fields, "language", record.language.as_deref());
    insert_list(&mut fields, "demographicTrades", record.demographic_trades_list());
    insert_list(&mut fields, "interests", record.interests_list());
    insert_str(&mut fields, "updatedAt", Some(&record.updated_at));

    if let Some(account) = account {
        if record.uuid.is_none() {
            insert_str(&mut fields, "uuid", account.uuid.as_deref());
        }
        insert_list(&mut fields, "toolUsage", account.tool_usage_list());
        insert_str(&mut fields, "company", account.company.as_deref());
        insert_str(&mut fields, "source", account.source.as_deref());
        insert_str(&mut fields, "accountType", account.account_type.as_deref());
        insert_list(&mut fields, "shop", account.shop_list());
        insert_list(&mut fields, "retailers", account.retailers_list());
    }

    fields
}

/// One per-market entry: the record's fields minus the promoted identity
/// fields.
pub(crate) fn market_entry(record: &PreferenceRecord) -> RecordFields {
    let mut fields = record_fields(record, None);
    for name in IDENTITY_FIELDS {
        fields.remove(*name);
    }
    fields
}

/// Overlay one layer onto the profile; same-named fields are overwritten.
pub(crate) fn overlay(base: &mut RecordFields, layer: RecordFields) {
    for (name, value) in layer {
        base.insert(name, value);
    }
}

/// Mirror internally-named fields under the synonyms the downstream schema
/// expects.
pub(crate) fn apply_synonyms(fields: &mut RecordFields) {
    if let Some(trades) = fields.get("demographicTrades").cloned() {
        fields.insert("trade".to_string(), trades);
    }
    if let Some(date) = fields.get("emailOptInDate").cloned() {
        fields.insert("newsletterSignupDate".to_string(), date);
    }
}

fn insert_str(fields: &mut RecordFields, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        fields.insert(name.to_string(), Value::String(value.to_string()));
    }
}

fn insert_bool(fields: &mut RecordFields, name: &str, value: Option<bool>) {
    if let Some(value) = value {
        fields.insert(name.to_string(), Value::Bool(value));
    }
}

fn insert_list(fields: &mut RecordFields, name: &str, value: Vec<String>) {
    if !value.is_empty() {
        fields.insert(
            name.to_string(),
            Value::Array(value.into_iter().map(Value::String).collect()),
        );
    }
}
