//! Locale resolution: bundled translation tables plus imported overlays.
//!
//! Lookup order for `(language, key)`:
//! 1. imported overlay for `language`
//! 2. bundled table for `language`
//! 3. bundled table for the default language
//! 4. the key itself
//!
//! Tables are flat maps of dotted keys (`admin.tabs.news_list`). Imported
//! packs may be nested JSON objects and are flattened on import.
use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use thiserror::Error;

use crate::storage::Database;
use crate::util::strip_control_chars;

const BUNDLED: &[(&str, &str)] = &[
    ("tr", include_str!("../locales/tr.json")),
    ("en", include_str!("../locales/en.json")),
];

/// Nesting depth accepted when flattening an imported pack.
const MAX_DEPTH: usize = 16;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("Invalid language pack JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Language pack must be a JSON object at the top level")]
    NotAnObject,

    #[error("Unsupported value at '{0}': only strings, numbers, booleans and objects are allowed")]
    InvalidValue(String),

    #[error("Language pack nested deeper than {MAX_DEPTH} levels at '{0}'")]
    TooDeep(String),

    #[error("Empty language code")]
    EmptyLanguage,
}

// ============================================================================
// Flattening
// ============================================================================

/// Flatten a JSON object into dotted keys. Scalars are stringified; arrays are rejected.
pub fn flatten_pack(value: &Value) -> Result<BTreeMap<String, String>, LocaleError> {
    let Value::Object(map) = value else {
        return Err(LocaleError::NotAnObject);
    };
    let mut out = BTreeMap::new();
    for (key, child) in map {
        flatten_into(key, child, 1, &mut out)?;
    }
    Ok(out)
}

fn flatten_into(
    path: &str,
    value: &Value,
    depth: usize,
    out: &mut BTreeMap<String, String>,
) -> Result<(), LocaleError> {
    if depth > MAX_DEPTH {
        return Err(LocaleError::TooDeep(path.to_string()));
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&format!("{path}.{key}"), child, depth + 1, out)?;
            }
        }
        Value::String(s) => {
            out.insert(path.to_string(), strip_control_chars(s).into_owned());
        }
        Value::Number(n) => {
            out.insert(path.to_string(), n.to_string());
        }
        Value::Bool(b) => {
            out.insert(path.to_string(), b.to_string());
        }
        Value::Null => {}
        Value::Array(_) => return Err(LocaleError::InvalidValue(path.to_string())),
    }
    Ok(())
}

// ============================================================================
// LocaleResolver
// ============================================================================

pub struct LocaleResolver {
    default_language: String,
    bundled: HashMap<String, BTreeMap<String, String>>,
    overlays: HashMap<String, BTreeMap<String, String>>,
}

impl LocaleResolver {
    /// Build a resolver over the tables compiled into the binary.
    pub fn new(default_language: &str) -> Result<Self, LocaleError> {
        let mut bundled = HashMap::new();
        for (code, raw) in BUNDLED {
            let value: Value = serde_json::from_str(raw)?;
            bundled.insert((*code).to_string(), flatten_pack(&value)?);
        }
        Ok(Self::with_tables(default_language, bundled))
    }

    /// Build a resolver over explicit tables.
    pub fn with_tables(
        default_language: &str,
        bundled: HashMap<String, BTreeMap<String, String>>,
    ) -> Self {
        Self {
            default_language: default_language.to_string(),
            bundled,
            overlays: HashMap::new(),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Load stored overlays for the given languages. Failures leave that overlay absent.
    pub async fn load_overlays(&mut self, db: &Database, languages: &[String]) {
        for lang in languages {
            match db.get_language_pack(lang).await {
                Ok(Some(pack)) => {
                    tracing::debug!(language = %lang, keys = pack.len(), "Loaded language pack");
                    self.overlays.insert(lang.clone(), pack);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(language = %lang, error = %e, "Failed to load language pack");
                }
            }
        }
    }

    /// Translate `key` for `language`, falling back as described in the module docs.
    pub fn t<'a>(&'a self, language: &str, key: &'a str) -> &'a str {
        self.lookup(language, key).unwrap_or(key)
    }

    /// Like [`LocaleResolver::t`] but `None` when no table has the key.
    pub fn lookup(&self, language: &str, key: &str) -> Option<&str> {
        self.overlays
            .get(language)
            .and_then(|m| m.get(key))
            .or_else(|| self.bundled.get(language).and_then(|m| m.get(key)))
            .or_else(|| {
                self.bundled
                    .get(&self.default_language)
                    .and_then(|m| m.get(key))
            })
            .map(String::as_str)
    }

    /// Languages that have a bundled table or an overlay.
    pub fn languages(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .bundled
            .keys()
            .chain(self.overlays.keys())
            .cloned()
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }

    /// Bundled table overlaid with the imported pack for one language.
    pub fn merged(&self, language: &str) -> BTreeMap<String, String> {
        let mut table = self.bundled.get(language).cloned().unwrap_or_default();
        if let Some(overlay) = self.overlays.get(language) {
            table.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        table
    }

    /// Parse a JSON pack and merge it into the overlay for `language`.
    ///
    /// Returns the flattened pack so the caller can persist it. Keys already
    /// in the overlay but absent from the pack are kept.
    pub fn import_pack(
        &mut self,
        language: &str,
        json: &str,
    ) -> Result<BTreeMap<String, String>, LocaleError> {
        let language = language.trim();
        if language.is_empty() {
            return Err(LocaleError::EmptyLanguage);
        }
        let value: Value = serde_json::from_str(json)?;
        let pack = flatten_pack(&value)?;

        let overlay = self.overlays.entry(language.to_string()).or_default();
        overlay.extend(pack.iter().map(|(k, v)| (k.clone(), v.clone())));
        tracing::info!(language = %language, keys = pack.len(), "Imported language pack");
        Ok(overlay.clone())
    }

    /// The merged table for `language` as pretty-printed JSON with dotted keys.
    pub fn export_pack(&self, language: &str) -> Result<String, LocaleError> {
        Ok(serde_json::to_string_pretty(&self.merged(language))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolver() -> LocaleResolver {
        LocaleResolver::new("tr").unwrap()
    }

    #[test]
    fn test_bundled_tables_parse() {
        let r = resolver();
        assert_eq!(r.t("tr", "nav.home"), "Ana Sayfa");
        assert_eq!(r.t("en", "nav.home"), "Home");
        assert_eq!(r.languages(), vec!["en", "tr"]);
    }

    #[test]
    fn test_bundled_tables_have_same_keys() {
        let r = resolver();
        let tr: Vec<_> = r.merged("tr").into_keys().collect();
        let en: Vec<_> = r.merged("en").into_keys().collect();
        assert_eq!(tr, en);
    }

    #[test]
    fn test_fallback_chain() {
        let r = resolver();
        // Unknown language falls back to the default
        assert_eq!(r.t("de", "nav.home"), "Ana Sayfa");
        // Unknown key falls back to the key
        assert_eq!(r.t("en", "no.such.key"), "no.such.key");
        assert_eq!(r.lookup("en", "no.such.key"), None);
    }

    #[test]
    fn test_import_nested_pack_overrides() {
        let mut r = resolver();
        let pack = r
            .import_pack("en", r#"{"nav": {"home": "Front Page", "extra": 3}}"#)
            .unwrap();
        assert_eq!(pack.get("nav.extra").map(String::as_str), Some("3"));
        assert_eq!(r.t("en", "nav.home"), "Front Page");
        // Other keys still come from the bundled table
        assert_eq!(r.t("en", "nav.trends"), "Trends");
        // Other languages untouched
        assert_eq!(r.t("tr", "nav.home"), "Ana Sayfa");
    }

    #[test]
    fn test_import_new_language() {
        let mut r = resolver();
        r.import_pack("de", r#"{"nav": {"home": "Startseite"}}"#).unwrap();
        assert_eq!(r.t("de", "nav.home"), "Startseite");
        // Missing keys fall back to the default language
        assert_eq!(r.t("de", "nav.trends"), "Trendler");
        assert!(r.languages().contains(&"de".to_string()));
    }

    #[test]
    fn test_import_strips_control_chars() {
        let mut r = resolver();
        r.import_pack("en", r#"{"nav": {"home": "Ho\u0000me"}}"#).unwrap();
        assert_eq!(r.t("en", "nav.home"), "Home");
    }

    #[test]
    fn test_import_rejects_bad_input() {
        let mut r = resolver();
        assert!(matches!(
            r.import_pack("en", "[1, 2]"),
            Err(LocaleError::NotAnObject)
        ));
        assert!(matches!(
            r.import_pack("en", r#"{"a": [1]}"#),
            Err(LocaleError::InvalidValue(ref k)) if k == "a"
        ));
        assert!(matches!(r.import_pack("en", "{nope"), Err(LocaleError::Parse(_))));
        assert!(matches!(r.import_pack(" ", "{}"), Err(LocaleError::EmptyLanguage)));
    }

    #[test]
    fn test_flatten_depth_limit() {
        let mut json = String::from("\"leaf\"");
        for _ in 0..(MAX_DEPTH + 1) {
            json = format!("{{\"k\": {json}}}");
        }
        let value: Value = serde_json::from_str(&json).unwrap();
        assert!(matches!(flatten_pack(&value), Err(LocaleError::TooDeep(_))));
    }

    #[test]
    fn test_export_reimports_identically() {
        let mut r = resolver();
        r.import_pack("en", r#"{"feed": {"empty": "Nothing here"}}"#)
            .unwrap();
        let exported = r.export_pack("en").unwrap();

        let mut fresh = LocaleResolver::with_tables("tr", HashMap::new());
        fresh.import_pack("en", &exported).unwrap();
        assert_eq!(fresh.merged("en"), r.merged("en"));
    }

    #[tokio::test]
    async fn test_load_overlays_from_store() {
        let db = Database::open(":memory:").await.unwrap();
        let mut pack = BTreeMap::new();
        pack.insert("nav.home".to_string(), "Anasayfa".to_string());
        db.save_language_pack("tr", &pack).await.unwrap();

        let mut r = resolver();
        r.load_overlays(&db, &["tr".to_string(), "en".to_string()])
            .await;
        assert_eq!(r.t("tr", "nav.home"), "Anasayfa");
        assert_eq!(r.t("en", "nav.home"), "Home");
    }
}
