//! Named gateway parameters.

use bytes::Bytes;
use std::collections::BTreeMap;

/// A single configuration value.
///
/// Most parameters are plain text. The client certificate is stored as raw
/// bytes since a PKCS#12 archive is not valid UTF-8.
#[derive(Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Text(String),
    Binary(Bytes),
}

impl ParameterValue {
    /// Borrow the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Text(s) => Some(s),
            ParameterValue::Binary(_) => None,
        }
    }

    /// Borrow the raw bytes of the value, whatever its kind.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ParameterValue::Text(s) => s.as_bytes(),
            ParameterValue::Binary(b) => b,
        }
    }
}

impl std::fmt::Debug for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ParameterValue::Binary(b) => write!(f, "Binary({} bytes)", b.len()),
        }
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for ParameterValue {
    fn from(value: Vec<u8>) -> Self {
        ParameterValue::Binary(Bytes::from(value))
    }
}

impl From<Bytes> for ParameterValue {
    fn from(value: Bytes) -> Self {
        ParameterValue::Binary(value)
    }
}

/// Mapping from parameter name to value.
///
/// Keys are unique; inserting an existing key replaces its value. No key or
/// value validation happens here.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Parameters(BTreeMap<String, ParameterValue>);

/// Shown instead of secret values in `Debug` output.
pub(crate) const REDACTED: &str = "<redacted>";

impl std::fmt::Debug for Parameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.0 {
            if name == super::keys::KEY {
                map.entry(name, &REDACTED);
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Copy every entry of `other` into `self`, `other` winning on collision.
    pub fn merge(&mut self, other: Parameters) {
        self.0.extend(other.0);
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.0.get(key)
    }

    /// Look up a text value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParameterValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
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

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<ParameterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overrides_existing_keys() {
        let mut base = Parameters::new().with("sign_type", "MD5").with("app_id", "wx1");
        base.merge(Parameters::new().with("app_id", "wx2"));

        assert_eq!(base.len(), 2);
        assert_eq!(base.get_str("app_id"), Some("wx2"));
        assert_eq!(base.get_str("sign_type"), Some("MD5"));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let params = Parameters::new()
            .with("app_id", "wx1")
            .with("key", "paymentwechattest000000000000000");
        let printed = format!("{params:?}");

        assert!(printed.contains("wx1"));
        assert!(printed.contains(REDACTED));
        assert!(!printed.contains("paymentwechattest"));
    }

    #[test]
    fn test_binary_value_is_not_text() {
        let params = Parameters::new().with("pfx", vec![0x30u8, 0x82, 0xff]);

        assert_eq!(params.get_str("pfx"), None);
        assert_eq!(params.get("pfx").map(ParameterValue::as_bytes), Some(&[0x30u8, 0x82, 0xff][..]));
        assert_eq!(format!("{:?}", params.get("pfx").unwrap()), "Binary(3 bytes)");
    }
}
