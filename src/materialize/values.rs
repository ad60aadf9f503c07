// ABOUTME: Renders the values.yaml written into a materialized repository.
// ABOUTME: Caller content is kept verbatim; otherwise device defaults are synthesized.

use serde::Serialize;

use crate::types::DeviceIdentity;

pub const VALUES_FILE: &str = "values.yaml";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DefaultValues<'a> {
    device: DeviceValues<'a>,
    route_host: String,
}

#[derive(Serialize)]
struct DeviceValues<'a> {
    name: &'a str,
    id: &'a str,
}

/// Caller-supplied values with CRLF normalized and exactly one trailing newline.
/// Blank input yields `None`.
pub fn normalize(content: &str) -> Option<String> {
    if content.trim().is_empty() {
        return None;
    }
    let mut normalized = content.replace("\r\n", "\n").trim_end().to_string();
    normalized.push('\n');
    Some(normalized)
}

/// Default values document for a device.
pub fn default_values(identity: &DeviceIdentity) -> Result<String, serde_yaml::Error> {
    let body = serde_yaml::to_string(&DefaultValues {
        device: DeviceValues {
            name: identity.device_name(),
            id: identity.device_id(),
        },
        route_host: identity.route_host().unwrap_or_default(),
    })?;
    Ok(format!(
        "# Auto-generated values for {} ({})\n{}",
        identity.device_name(),
        identity.device_id(),
        body
    ))
}

/// Values text to write: normalized caller content, else the device defaults.
pub fn render(identity: &DeviceIdentity, extra: Option<&str>) -> Result<String, serde_yaml::Error> {
    match extra.and_then(normalize) {
        Some(content) => Ok(content),
        None => default_values(identity),
    }
}
