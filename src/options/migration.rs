use super::{OptionStore, OptionStoreError, PluginOptions};
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const OPTIONS_KEY: &str = "mgl_options";
pub const LEGACY_PREFIX: &str = "mgl_";
pub const SCHEMA_VERSION_KEY: &str = "schema_version";
pub const SCHEMA_VERSION: u64 = 1;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MigrationReport {
    pub from_legacy: Vec<String>,
    pub from_default: Vec<String>,
    /// Legacy values their option cannot hold. These take the default.
    pub rejected: Vec<String>,
    pub written: bool,
}

/// Folds scattered `mgl_<option>` keys into the unified record.
///
/// Each option missing from the record takes its legacy value, or the
/// default when there is none or when the legacy value does not decode for
/// that option. The legacy key is removed either way. The record is
/// stamped with [`SCHEMA_VERSION`]; a stamped record is left untouched, so
/// running this twice is harmless.
pub fn migrate(store: &dyn OptionStore) -> Result<MigrationReport, OptionStoreError> {
    let mut record = match store.get(OPTIONS_KEY)? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let version = record
        .get(SCHEMA_VERSION_KEY)
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if version >= SCHEMA_VERSION {
        return Ok(MigrationReport::default());
    }

    let defaults = match serde_json::to_value(PluginOptions::default())? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let mut report = MigrationReport::default();
    for (key, default) in defaults {
        if record.get(&key).is_some_and(|value| !value.is_null()) {
            continue;
        }
        let legacy_key = format!("{}{}", LEGACY_PREFIX, key);
        match store.get(&legacy_key)? {
            Some(legacy) if PluginOptions::accepts(&key, &legacy) => {
                record.insert(key.clone(), legacy);
                store.delete(&legacy_key)?;
                report.from_legacy.push(key);
            }
            Some(legacy) => {
                warn!(
                    "Legacy option {} has an unusable value {}, using the default",
                    legacy_key, legacy
                );
                record.insert(key.clone(), default);
                store.delete(&legacy_key)?;
                report.rejected.push(key);
            }
            None => {
                record.insert(key.clone(), default);
                report.from_default.push(key);
            }
        }
    }

    record.insert(SCHEMA_VERSION_KEY.to_string(), SCHEMA_VERSION.into());
    store.set(OPTIONS_KEY, Value::Object(record))?;
    report.written = true;

    info!(
        "Plugin options migrated to schema {} ({} legacy keys folded in)",
        SCHEMA_VERSION,
        report.from_legacy.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::MemoryOptionStore;
    use serde_json::json;

    #[test]
    fn test_legacy_keys_are_folded_and_deleted() {
        let store = MemoryOptionStore::with_values([
            ("mgl_layout".to_string(), json!("masonry")),
            ("mgl_masonry_columns".to_string(), json!("4")),
            ("unrelated".to_string(), json!(true)),
        ]);

        let report = migrate(&store).unwrap();
        assert!(report.written);
        assert_eq!(report.from_legacy, vec!["layout", "masonry_columns"]);

        let record = store.get(OPTIONS_KEY).unwrap().unwrap();
        assert_eq!(record["layout"], json!("masonry"));
        assert_eq!(record["masonry_columns"], json!("4"));
        assert_eq!(record["square_columns"], json!(5));
        assert_eq!(record[SCHEMA_VERSION_KEY], json!(SCHEMA_VERSION));

        assert_eq!(store.get("mgl_layout").unwrap(), None);
        assert_eq!(store.get("unrelated").unwrap(), Some(json!(true)));

        let options: PluginOptions = serde_json::from_value(record).unwrap();
        assert_eq!(options.masonry_columns, 4);
    }

    #[test]
    fn test_unusable_legacy_value_keeps_the_default() {
        let store = MemoryOptionStore::with_values([
            ("mgl_masonry_columns".to_string(), json!("lots")),
            ("mgl_masonry_gutter".to_string(), json!("12")),
            ("mgl_layout".to_string(), json!("masonry")),
        ]);

        let report = migrate(&store).unwrap();
        assert_eq!(report.rejected, vec!["masonry_columns"]);
        assert_eq!(report.from_legacy, vec!["layout", "masonry_gutter"]);
        assert_eq!(store.get("mgl_masonry_columns").unwrap(), None);

        let record = store.get(OPTIONS_KEY).unwrap().unwrap();
        assert_eq!(record["masonry_columns"], json!(3));

        let options: PluginOptions = serde_json::from_value(record).unwrap();
        assert_eq!(options.layout, "masonry");
        assert_eq!(options.masonry_gutter, 12);
        assert_eq!(options.masonry_columns, 3);
    }

    #[test]
    fn test_existing_values_win_over_legacy_keys() {
        let store = MemoryOptionStore::with_values([
            (OPTIONS_KEY.to_string(), json!({ "layout": "justified" })),
            ("mgl_layout".to_string(), json!("masonry")),
        ]);

        migrate(&store).unwrap();
        let record = store.get(OPTIONS_KEY).unwrap().unwrap();
        assert_eq!(record["layout"], json!("justified"));
        // Only missing keys consult their legacy value.
        assert_eq!(store.get("mgl_layout").unwrap(), Some(json!("masonry")));
    }

    #[test]
    fn test_migration_is_idempotent() {
        let store = MemoryOptionStore::with_values([("mgl_infinite".to_string(), json!("1"))]);

        let first = migrate(&store).unwrap();
        let record = store.get(OPTIONS_KEY).unwrap();
        let second = migrate(&store).unwrap();

        assert!(first.written);
        assert!(!second.written);
        assert_eq!(store.get(OPTIONS_KEY).unwrap(), record);
    }
}
