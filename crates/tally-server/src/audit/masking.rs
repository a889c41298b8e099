//! Sensitive-field masking for audit snapshots
//!
//! Only top-level keys of a JSON object are inspected. A key is sensitive
//! when it contains one of the configured names, compared case-insensitively,
//! so `userPassword` and `API_KEY_HASH` are both caught by the defaults.

use serde_json::Value;

/// Value written in place of a sensitive field
pub const REDACTION_MARKER: &str = "***REDACTED***";

/// Field-name fragments masked when no override is configured
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "ssn",
    "creditcard",
    "cardnumber",
    "cvv",
    "apikey",
];

/// Replaces sensitive top-level fields with [`REDACTION_MARKER`]
#[derive(Debug, Clone)]
pub struct SensitiveFieldMasker {
    /// Lowercased name fragments
    fragments: Vec<String>,
}

impl Default for SensitiveFieldMasker {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVE_FIELDS.iter().copied())
    }
}

impl SensitiveFieldMasker {
    /// Build a masker from name fragments; blank fragments are ignored
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fragments = fragments
            .into_iter()
            .map(|f| f.as_ref().trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        Self { fragments }
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.fragments.iter().any(|fragment| key.contains(fragment.as_str()))
    }

    /// Masked copy of `value`; the input is left untouched
    ///
    /// Anything other than a JSON object is returned as-is.
    pub fn mask(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, field)| {
                        if self.is_sensitive(key) {
                            (key.clone(), Value::String(REDACTION_MARKER.to_string()))
                        } else {
                            (key.clone(), field.clone())
                        }
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Mask serialized JSON text
    ///
    /// Text that does not parse as JSON is returned unchanged. Callers that
    /// hand in free-form text get no protection from this method.
    pub fn mask_text(&self, text: &str) -> String {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.mask(&value).to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot is not JSON; stored without masking");
                text.to_string()
            },
        }
    }
}
