// Plugin-wide defaults and the store they live in
mod migration;
mod store;

pub use migration::{
    LEGACY_PREFIX, MigrationReport, OPTIONS_KEY, SCHEMA_VERSION, SCHEMA_VERSION_KEY, migrate,
};
pub use store::{DynOptionStore, JsonFileOptionStore, MemoryOptionStore, OptionStore, OptionStoreError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderingMode {
    /// Image markup is also written into the page.
    #[default]
    Dom,
    Js,
}

/// The unified plugin options record. Field names are the stored keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginOptions {
    #[serde(deserialize_with = "de::text")]
    pub layout: String,
    #[serde(deserialize_with = "de::text")]
    pub captions: String,
    #[serde(deserialize_with = "de::optional_text")]
    pub link: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub captions_alignment: String,
    #[serde(deserialize_with = "de::text")]
    pub captions_background: String,
    #[serde(deserialize_with = "de::optional_text")]
    pub animation: Option<String>,
    #[serde(deserialize_with = "de::text")]
    pub image_size: String,
    #[serde(deserialize_with = "de::flag")]
    pub infinite: bool,
    #[serde(deserialize_with = "de::number")]
    pub infinite_buffer: u32,
    pub rendering_mode: RenderingMode,

    #[serde(deserialize_with = "de::number")]
    pub tiles_gutter: u32,
    #[serde(deserialize_with = "de::number")]
    pub tiles_gutter_tablet: u32,
    #[serde(deserialize_with = "de::number")]
    pub tiles_gutter_mobile: u32,
    #[serde(deserialize_with = "de::text")]
    pub tiles_density: String,
    #[serde(deserialize_with = "de::text")]
    pub tiles_density_tablet: String,
    #[serde(deserialize_with = "de::text")]
    pub tiles_density_mobile: String,

    #[serde(deserialize_with = "de::number")]
    pub masonry_gutter: u32,
    #[serde(deserialize_with = "de::number")]
    pub masonry_columns: u32,
    #[serde(deserialize_with = "de::flag")]
    pub masonry_left_to_right: bool,

    #[serde(deserialize_with = "de::number")]
    pub justified_gutter: u32,
    #[serde(deserialize_with = "de::number")]
    pub justified_row_height: u32,

    #[serde(deserialize_with = "de::number")]
    pub square_gutter: u32,
    #[serde(deserialize_with = "de::number")]
    pub square_columns: u32,

    #[serde(deserialize_with = "de::number")]
    pub cascade_gutter: u32,

    #[serde(deserialize_with = "de::number")]
    pub horizontal_gutter: u32,
    #[serde(deserialize_with = "de::number")]
    pub horizontal_image_height: u32,
    #[serde(deserialize_with = "de::flag")]
    pub horizontal_hide_scrollbar: bool,

    #[serde(deserialize_with = "de::number")]
    pub carousel_gutter: u32,
    #[serde(deserialize_with = "de::number")]
    pub carousel_image_height: u32,
    #[serde(deserialize_with = "de::flag")]
    pub carousel_arrow_nav_enabled: bool,
    #[serde(deserialize_with = "de::flag")]
    pub carousel_dot_nav_enabled: bool,
    #[serde(deserialize_with = "de::flag")]
    pub carousel_infinite: bool,
    #[serde(deserialize_with = "de::flag")]
    pub carousel_aspect_ratio: bool,

    #[serde(deserialize_with = "de::text")]
    pub map_engine: String,
    #[serde(deserialize_with = "de::number")]
    pub map_height: u32,
    #[serde(deserialize_with = "de::number")]
    pub map_zoom: u32,
    #[serde(deserialize_with = "de::number")]
    pub map_gutter: u32,
    #[serde(deserialize_with = "de::text")]
    pub googlemaps_token: String,
    #[serde(deserialize_with = "de::text")]
    pub googlemaps_style: String,
    #[serde(deserialize_with = "de::text")]
    pub mapbox_token: String,
    #[serde(deserialize_with = "de::text")]
    pub mapbox_style: String,
    #[serde(deserialize_with = "de::text")]
    pub maptiler_token: String,

    #[serde(deserialize_with = "de::flag")]
    pub right_click: bool,
    #[serde(deserialize_with = "de::flag")]
    pub gallery_shortcode_override_disabled: bool,
    #[serde(deserialize_with = "de::flag")]
    pub skeleton_loading: bool,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            layout: "tiles".to_string(),
            captions: "none".to_string(),
            link: None,
            captions_alignment: "center".to_string(),
            captions_background: "fade-black".to_string(),
            animation: None,
            image_size: "srcset".to_string(),
            infinite: false,
            infinite_buffer: 0,
            rendering_mode: RenderingMode::Dom,
            tiles_gutter: 10,
            tiles_gutter_tablet: 10,
            tiles_gutter_mobile: 10,
            tiles_density: "high".to_string(),
            tiles_density_tablet: "medium".to_string(),
            tiles_density_mobile: "low".to_string(),
            masonry_gutter: 5,
            masonry_columns: 3,
            masonry_left_to_right: false,
            justified_gutter: 5,
            justified_row_height: 200,
            square_gutter: 5,
            square_columns: 5,
            cascade_gutter: 10,
            horizontal_gutter: 10,
            horizontal_image_height: 500,
            horizontal_hide_scrollbar: false,
            carousel_gutter: 5,
            carousel_image_height: 500,
            carousel_arrow_nav_enabled: true,
            carousel_dot_nav_enabled: true,
            carousel_infinite: false,
            carousel_aspect_ratio: false,
            map_engine: String::new(),
            map_height: 500,
            map_zoom: 10,
            map_gutter: 10,
            googlemaps_token: String::new(),
            googlemaps_style: "[]".to_string(),
            mapbox_token: String::new(),
            mapbox_style: r#"{"username":"", "style_id":""}"#.to_string(),
            maptiler_token: String::new(),
            right_click: false,
            gallery_shortcode_override_disabled: false,
            skeleton_loading: true,
        }
    }
}

impl PluginOptions {
    /// Whether images go through the responsive `srcset` path.
    pub fn uses_srcset(&self) -> bool {
        self.image_size.is_empty() || self.image_size == "srcset"
    }

    /// Whether `value` decodes for the option stored under `key`. Unknown
    /// keys are accepted and ignored.
    pub fn accepts(key: &str, value: &Value) -> bool {
        let single = Map::from_iter([(key.to_string(), value.clone())]);
        serde_json::from_value::<Self>(Value::Object(single)).is_ok()
    }

    /// Decodes a stored record one field at a time. A field whose value
    /// does not decode keeps its default.
    pub fn from_record(record: Value) -> Self {
        let Value::Object(map) = record else {
            warn!("Plugin options record is not an object, using defaults");
            return Self::default();
        };
        let usable: Map<String, Value> = map
            .into_iter()
            .filter(|(key, value)| {
                let ok = Self::accepts(key, value);
                if !ok {
                    warn!("Option {} has an unusable value {}, using the default", key, value);
                }
                ok
            })
            .collect();
        serde_json::from_value(Value::Object(usable)).unwrap_or_default()
    }
}

/// Lenient decoders for values written by older versions, which stored
/// everything as strings (`"1"`, `""`, `"10"`).
mod de {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
            _ => false,
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let parsed = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };
        match parsed {
            Some(n) if n >= 0.0 && n <= f64::from(u32::MAX) => Ok(n as u32),
            _ => Err(D::Error::custom(format!("expected a number, got {}", value))),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) | Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    /// `null`, `false` and `""` all mean "not set".
    pub fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(Some(text(deserializer)?).filter(|s| !s.is_empty()))
    }
}

/// Read-mostly access to the plugin options record. Legacy keys are
/// migrated on the first read of the process.
pub struct Settings {
    store: DynOptionStore,
    migrated: AtomicBool,
}

impl Settings {
    pub fn new(store: DynOptionStore) -> Self {
        Self {
            store,
            migrated: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &DynOptionStore {
        &self.store
    }

    /// Never fails: a broken record logs a warning and yields the defaults.
    pub fn load(&self) -> PluginOptions {
        match self.try_load() {
            Ok(options) => options,
            Err(e) => {
                warn!("Failed to load plugin options, using defaults: {}", e);
                PluginOptions::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<PluginOptions, OptionStoreError> {
        if !self.migrated.load(Ordering::Acquire) {
            let report = migrate(self.store.as_ref())?;
            if report.written {
                debug!(
                    "Options migrated: {} legacy keys, {} defaults",
                    report.from_legacy.len(),
                    report.from_default.len()
                );
            }
            self.migrated.store(true, Ordering::Release);
        }

        match self.store.get(OPTIONS_KEY)? {
            Some(record) => Ok(PluginOptions::from_record(record)),
            None => Ok(PluginOptions::default()),
        }
    }

    /// Writes a full record.
    pub fn update(&self, options: &PluginOptions) -> Result<bool, OptionStoreError> {
        let mut record = serde_json::to_value(options)?;
        if let Some(map) = record.as_object_mut() {
            map.insert(SCHEMA_VERSION_KEY.to_string(), SCHEMA_VERSION.into());
        }
        self.store.set(OPTIONS_KEY, record)
    }

    pub fn reset(&self) -> Result<(), OptionStoreError> {
        self.store.delete(OPTIONS_KEY)?;
        self.migrated.store(false, Ordering::Release);
        Ok(())
    }

    pub fn migrate(&self) -> Result<MigrationReport, OptionStoreError> {
        let report = migrate(self.store.as_ref())?;
        self.migrated.store(true, Ordering::Release);
        Ok(report)
    }
}
