// ABOUTME: Validated domain types for device provisioning.
// ABOUTME: Device identity, canonical resource names, and chart references.

mod canonical_name;
mod chart_ref;
mod device;

pub use canonical_name::{CanonicalName, CanonicalNameError, MAX_NAME_LEN};
pub use chart_ref::{ChartRef, ParseChartRefError};
pub use device::{DeviceIdentity, DeviceIdentityError};
