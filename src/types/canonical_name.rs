// ABOUTME: DNS-compatible canonical names shared by device repositories and applications.
// ABOUTME: Derives "device-<name>-<id>" and enforces RFC 1123 label requirements.

use super::device::DeviceIdentity;
use std::fmt;
use thiserror::Error;

/// Kubernetes resource names (and Argo CD application names) are DNS labels.
pub const MAX_NAME_LEN: usize = 63;

const PREFIX: &str = "device";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanonicalNameError {
    #[error("canonical name cannot be empty")]
    Empty,

    #[error("canonical name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("canonical name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("canonical name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("canonical name must be lowercase")]
    NotLowercase,

    #[error("invalid character in canonical name: '{0}'")]
    InvalidChar(char),

    #[error("device_id '{0}' is too long to form a canonical name")]
    DeviceIdTooLong(String),

    #[error("device_id '{0}' contains no usable characters")]
    DeviceIdUnusable(String),
}

/// The normalized `device-<name>-<id>` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalName(String);

impl CanonicalName {
    /// Validate an already-normalized name.
    pub fn new(value: &str) -> Result<Self, CanonicalNameError> {
        if value.is_empty() {
            return Err(CanonicalNameError::Empty);
        }

        if value.len() > MAX_NAME_LEN {
            return Err(CanonicalNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(CanonicalNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(CanonicalNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(CanonicalNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(CanonicalNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    /// Derive the canonical name for a device.
    ///
    /// The device name is the human-readable part and is truncated first when
    /// the result would exceed 63 characters. The id is never truncated.
    pub fn for_device(identity: &DeviceIdentity) -> Result<Self, CanonicalNameError> {
        let id = normalize_segment(identity.device_id());
        if id.is_empty() {
            return Err(CanonicalNameError::DeviceIdUnusable(
                identity.device_id().to_string(),
            ));
        }

        // "device-" + id must fit on its own.
        let fixed = PREFIX.len() + 1 + id.len();
        if fixed > MAX_NAME_LEN {
            return Err(CanonicalNameError::DeviceIdTooLong(
                identity.device_id().to_string(),
            ));
        }

        let mut name = normalize_segment(identity.device_name());
        // Room left for "<name>-".
        let budget = MAX_NAME_LEN - fixed;
        if name.len() + 1 > budget {
            name.truncate(budget.saturating_sub(1));
            while name.ends_with('-') {
                name.pop();
            }
        }

        let value = if name.is_empty() {
            format!("{PREFIX}-{id}")
        } else {
            format!("{PREFIX}-{name}-{id}")
        };

        Self::new(&value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CanonicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercase, map everything outside `[a-z0-9]` to a hyphen, collapse runs and
/// trim hyphens at both ends. Output is pure ASCII.
fn normalize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
