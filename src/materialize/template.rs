// ABOUTME: Placeholder verification and substitution for static template files.

use crate::config::TemplateFile;
use crate::types::DeviceIdentity;

pub const DEVICE_ID_TOKEN: &str = "{{DEVICE_ID}}";
pub const DEVICE_NAME_TOKEN: &str = "{{DEVICE_NAME}}";
pub const CLUSTER_FQDN_TOKEN: &str = "{{CLUSTER_FQDN}}";

/// First required placeholder absent from `content`, if any.
pub fn missing_placeholder(file: &TemplateFile, content: &str) -> Option<&'static str> {
    let mut required = vec![DEVICE_ID_TOKEN, DEVICE_NAME_TOKEN];
    if file.route {
        required.push(CLUSTER_FQDN_TOKEN);
    }
    required.into_iter().find(|token| !content.contains(token))
}

/// Replace every occurrence of each placeholder.
pub fn substitute(content: &str, identity: &DeviceIdentity) -> String {
    let mut out = content
        .replace(DEVICE_ID_TOKEN, identity.device_id())
        .replace(DEVICE_NAME_TOKEN, identity.device_name());
    if let Some(fqdn) = identity.cluster_fqdn() {
        out = out.replace(CLUSTER_FQDN_TOKEN, fqdn);
    }
    out
}
