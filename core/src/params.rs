//! Request parameters and their form encoding.
//!
//! `Params` keeps insertion order so the encoded query string is
//! deterministic. Encoding is `application/x-www-form-urlencoded` in UTF-8
//! with spaces written as `+`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered name → scalar mapping. Values are stored in their string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(IndexMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name`. An existing key keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.0.insert(name.into(), value.to_string());
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `overrides` on a copy of `self`.
    ///
    /// Keys of `self` keep their position; colliding values are replaced by
    /// the override and new keys are appended in the override's order.
    pub fn overlaid_with(&self, overrides: &Params) -> Params {
        let mut merged = self.clone();
        for (name, value) in &overrides.0 {
            merged.0.insert(name.clone(), value.clone());
        }
        merged
    }

    pub fn to_form_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// What a call sends: a parameter mapping to form-encode, or a body that is
/// already serialized (JSON or XML text) and goes out verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Form(Params),
    Raw(String),
}

impl Payload {
    /// Wire form: form-encoded for `Form`, unchanged for `Raw`.
    pub fn encode(&self) -> String {
        match self {
            Payload::Form(params) => params.to_form_string(),
            Payload::Raw(body) => body.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Form(params) => params.is_empty(),
            Payload::Raw(body) => body.is_empty(),
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Form(Params::new())
    }
}

impl From<Params> for Payload {
    fn from(params: Params) -> Self {
        Payload::Form(params)
    }
}

impl From<String> for Payload {
    fn from(body: String) -> Self {
        Payload::Raw(body)
    }
}

impl From<&str> for Payload {
    fn from(body: &str) -> Self {
        Payload::Raw(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_keeps_positions_and_lets_overrides_win() {
        let call_site: Params = [("a", "2"), ("b", "3")].into_iter().collect();
        let defaults: Params = [("c", "4"), ("a", "1")].into_iter().collect();

        let merged = call_site.overlaid_with(&defaults);

        let pairs: Vec<_> = merged.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "3"), ("c", "4")]);
        // The inputs are untouched.
        assert_eq!(call_site.get("a"), Some("2"));
    }

    #[test]
    fn form_encoding_escapes_reserved_characters() {
        let params = Params::new()
            .with("q", "New York")
            .with("filter", "a&b=c")
            .with("city", "Zürich");
        assert_eq!(
            params.to_form_string(),
            "q=New+York&filter=a%26b%3Dc&city=Z%C3%BCrich"
        );
    }

    #[test]
    fn scalar_values_are_stringified() {
        let params = Params::new().with("lat", 38.7).with("cnt", 3).with("flag", true);
        assert_eq!(params.to_form_string(), "lat=38.7&cnt=3&flag=true");
    }

    #[test]
    fn raw_payload_encodes_verbatim() {
        let payload = Payload::from(r#"{"a": 1}"#);
        assert_eq!(payload.encode(), r#"{"a": 1}"#);
        assert!(Payload::default().is_empty());
    }
}
