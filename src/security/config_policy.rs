use crate::security::validator::ValidationError;
use crate::security::ALLOWED_CONFIG_KEYS;

/// A configuration write that passed [`ConfigPolicy::check_set`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    key: &'static str,
    value: String,
}

impl ConfigEntry {
    /// Canonical (lowercase) key from the allowlist
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Value with surrounding whitespace removed
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Gate for configuration writes
pub struct ConfigPolicy;

impl ConfigPolicy {
    /// Check a key/value pair against the allowlist
    pub fn check_set(key: &str, value: &str) -> Result<ConfigEntry, ValidationError> {
        let canonical = Self::canonical_key(key).ok_or_else(|| {
            ValidationError::ConfigKeyNotAllowed {
                key: key.to_string(),
                allowed: ALLOWED_CONFIG_KEYS.to_vec(),
            }
        })?;

        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::ConfigValueEmpty(canonical.to_string()));
        }

        Ok(ConfigEntry {
            key: canonical,
            value: value.to_string(),
        })
    }

    /// Variant for untyped JSON input where the value may not be a string
    pub fn check_set_json(key: &str, value: &serde_json::Value) -> Result<ConfigEntry, ValidationError> {
        match value.as_str() {
            Some(value) => Self::check_set(key, value),
            None => {
                // Key errors take precedence so callers still learn the allowlist
                let canonical = Self::canonical_key(key).ok_or_else(|| {
                    ValidationError::ConfigKeyNotAllowed {
                        key: key.to_string(),
                        allowed: ALLOWED_CONFIG_KEYS.to_vec(),
                    }
                })?;
                Err(ValidationError::ConfigValueNotString(canonical.to_string()))
            }
        }
    }

    pub fn is_allowed(key: &str) -> bool {
        Self::canonical_key(key).is_some()
    }

    fn canonical_key(key: &str) -> Option<&'static str> {
        ALLOWED_CONFIG_KEYS
            .iter()
            .copied()
            .find(|allowed| allowed.eq_ignore_ascii_case(key))
    }
}
