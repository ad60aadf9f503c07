// ABOUTME: Environment variable value types with interpolation support.
// ABOUTME: Handles literal values and references to environment variables.

use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    /// Resolve an optional value. Unset variables and blank values become `None`.
    pub fn resolve_optional(&self) -> Option<String> {
        let value = match self {
            EnvValue::Literal(s) => Some(s.clone()),
            EnvValue::FromEnv { var, default } => std::env::var(var).ok().or(default.clone()),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Resolve an optional secret without ever holding it in a plain `String` field.
    pub fn resolve_secret(&self) -> Option<SecretString> {
        self.resolve_optional().map(SecretString::from)
    }
}

/// Resolve an optional config entry.
pub fn resolve_opt(value: Option<&EnvValue>) -> Option<String> {
    value.and_then(EnvValue::resolve_optional)
}
