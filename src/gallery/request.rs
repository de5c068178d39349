use super::sanitize::escape_attr;
use crate::library::MediaId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// One call-site attribute value. Shortcode-style attributes arrive as text,
/// block editors send booleans, numbers and lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<AttrValue>),
}

impl AttrValue {
    pub fn text(value: impl Into<String>) -> Self {
        AttrValue::Text(value.into())
    }

    pub fn to_text(&self) -> String {
        match self {
            AttrValue::Null => String::new(),
            AttrValue::Bool(true) => "1".to_string(),
            AttrValue::Bool(false) => String::new(),
            AttrValue::Int(n) => n.to_string(),
            AttrValue::Float(f) => f.to_string(),
            AttrValue::Text(s) => s.clone(),
            AttrValue::List(items) => items
                .iter()
                .map(AttrValue::to_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Loose emptiness: `""`, `"0"`, `0`, `false`, null and empty lists.
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Null => true,
            AttrValue::Bool(b) => !b,
            AttrValue::Int(n) => *n == 0,
            AttrValue::Float(f) => *f == 0.0,
            AttrValue::Text(s) => s.is_empty() || s == "0",
            AttrValue::List(items) => items.is_empty(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        !self.is_empty()
    }

    /// Comma-separated text and nested lists both flatten to trimmed items.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            AttrValue::Null | AttrValue::Bool(_) => Vec::new(),
            AttrValue::List(items) => items.iter().flat_map(AttrValue::as_list).collect(),
            other => other
                .to_text()
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            AttrValue::Int(n) => u32::try_from(*n).ok(),
            AttrValue::Float(f) if *f >= 0.0 && *f <= f64::from(u32::MAX) => Some(*f as u32),
            AttrValue::Text(s) => {
                let s = s.trim();
                s.parse::<u32>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u32))
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            AttrValue::Int(n) => Some(*n != 0),
            AttrValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "" | "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn escaped(&self) -> AttrValue {
        match self {
            AttrValue::Text(s) => AttrValue::Text(escape_attr(s)),
            AttrValue::List(items) => AttrValue::List(items.iter().map(AttrValue::escaped).collect()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

/// The attribute mapping for one composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositionRequest {
    attrs: BTreeMap<String, AttrValue>,
}

impl CompositionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a request from raw text pairs, e.g. a query string.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), AttrValue::Text(v.into())))
            .collect()
    }

    /// Parses `key=value` arguments; a bare `key` becomes `key=1`.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        args.iter()
            .map(|arg| match arg.as_ref().split_once('=') {
                Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
                None => (arg.as_ref().trim().to_string(), "1".to_string()),
            })
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key, AttrValue::Text(value)))
            .collect()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Escapes every text value so no raw markup reaches the pipeline.
    /// Nulls stay null.
    pub fn sanitized(&self) -> Self {
        Self {
            attrs: self
                .attrs
                .iter()
                .map(|(key, value)| (key.clone(), value.escaped()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Present and not null.
    pub fn is_set(&self, key: &str) -> bool {
        matches!(self.attrs.get(key), Some(value) if *value != AttrValue::Null)
    }

    /// Absent, null or loosely empty.
    pub fn is_empty(&self, key: &str) -> bool {
        self.attrs.get(key).is_none_or(AttrValue::is_empty)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.attrs
            .get(key)
            .filter(|value| **value != AttrValue::Null)
            .map(AttrValue::to_text)
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        self.attrs.get(key).map(AttrValue::as_list).unwrap_or_default()
    }

    /// Numeric ids from a list attribute. Items that are not ids are skipped.
    pub fn ids(&self, key: &str) -> Vec<MediaId> {
        self.list(key)
            .into_iter()
            .filter_map(|item| match item.parse::<MediaId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    debug!("Skipping non-numeric id '{}' in '{}'", item, key);
                    None
                }
            })
            .collect()
    }

    pub fn u32(&self, key: &str) -> Option<u32> {
        self.attrs.get(key).and_then(AttrValue::as_u32)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.attrs.get(key).and_then(AttrValue::as_bool)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: AttrValue) -> Option<AttrValue> {
        self.attrs.insert(key.into(), value)
    }

    pub fn insert_if_absent(&mut self, key: &str, value: AttrValue) {
        if !self.is_set(key) {
            self.attrs.insert(key.to_string(), value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.attrs.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }
}

impl<K: Into<String>> FromIterator<(K, AttrValue)> for CompositionRequest {
    fn from_iter<T: IntoIterator<Item = (K, AttrValue)>>(iter: T) -> Self {
        Self {
            attrs: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_emptiness() {
        assert!(AttrValue::text("").is_empty());
        assert!(AttrValue::text("0").is_empty());
        assert!(AttrValue::Int(0).is_empty());
        assert!(AttrValue::Null.is_empty());
        assert!(AttrValue::List(vec![]).is_empty());
        assert!(!AttrValue::text("false").is_empty());
        assert!(!AttrValue::Int(3).is_empty());
    }

    #[test]
    fn test_list_flattening() {
        assert_eq!(AttrValue::text("1, 2,,3").as_list(), vec!["1", "2", "3"]);
        let nested = AttrValue::List(vec![AttrValue::Int(4), AttrValue::text("5,6")]);
        assert_eq!(nested.as_list(), vec!["4", "5", "6"]);
        assert_eq!(nested.to_text(), "4,5,6");
    }

    #[test]
    fn test_numeric_and_flag_coercion() {
        assert_eq!(AttrValue::text(" 12 ").as_u32(), Some(12));
        assert_eq!(AttrValue::text("12.7").as_u32(), Some(12));
        assert_eq!(AttrValue::text("-3").as_u32(), None);
        assert_eq!(AttrValue::text("abc").as_u32(), None);
        assert_eq!(AttrValue::text("true").as_bool(), Some(true));
        assert_eq!(AttrValue::text("0").as_bool(), Some(false));
        assert_eq!(AttrValue::text("maybe").as_bool(), None);
    }

    #[test]
    fn test_sanitized_escapes_text_and_keeps_null() {
        let request = CompositionRequest::new()
            .with("caption", "<script>x</script>")
            .with("list", AttrValue::List(vec![AttrValue::text("\"a\"")]))
            .with("none", AttrValue::Null)
            .with("n", 4_i64);

        let clean = request.sanitized();
        assert_eq!(
            clean.text("caption").unwrap(),
            "&lt;script&gt;x&lt;/script&gt;"
        );
        assert_eq!(clean.list("list"), vec!["&quot;a&quot;"]);
        assert_eq!(clean.get("none"), Some(&AttrValue::Null));
        assert!(!clean.is_set("none"));
        assert_eq!(clean.u32("n"), Some(4));
    }

    #[test]
    fn test_ids_skip_garbage() {
        let request = CompositionRequest::new().with("ids", "3,x,7");
        assert_eq!(request.ids("ids"), vec![3, 7]);
    }

    #[test]
    fn test_from_args() {
        let request = CompositionRequest::from_args(&["ids=1,2", "hero", "layout = masonry"]);
        assert_eq!(request.ids("ids"), vec![1, 2]);
        assert_eq!(request.flag("hero"), Some(true));
        assert_eq!(request.text("layout").unwrap(), "masonry");
    }

    #[test]
    fn test_json_shape() {
        let request: CompositionRequest =
            serde_json::from_str(r#"{"ids":[1,2],"hero":true,"layout":"tiles","x":null}"#).unwrap();
        assert_eq!(request.ids("ids"), vec![1, 2]);
        assert_eq!(request.flag("hero"), Some(true));
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"hero":true,"ids":[1,2],"layout":"tiles","x":null}"#
        );
    }
}
