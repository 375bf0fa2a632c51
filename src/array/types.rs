//! Records returned by the array management API.
//!
//! Each record names the fields this crate reads and keeps every other
//! attribute in `extra`, so printing a record shows what the array sent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Attributes the crate does not interpret.
pub type Extra = BTreeMap<String, Value>;

/// Identity and software version of an array.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ArrayInfo {
    /// Array name.
    pub array_name: String,
    /// Array identifier.
    pub id: String,
    /// Operating environment version.
    pub version: String,
    /// Build revision, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub extra: Extra,
}

/// Capacity and data-reduction metrics for an array.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SpaceInfo {
    /// Usable capacity in bytes.
    pub capacity: u64,
    /// Physical space used in bytes.
    pub total: u64,
    /// Data reduction ratio.
    #[serde(default)]
    pub data_reduction: f64,
    /// Total reduction ratio, including thin provisioning.
    #[serde(default)]
    pub total_reduction: f64,
    /// Space used by volumes in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<u64>,
    /// Space used by snapshots in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<u64>,
    /// Space shared between volumes and snapshots in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_space: Option<u64>,
    /// Space used by the array itself in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<u64>,
    /// Fraction of provisioned space that is unwritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thin_provisioning: Option<f64>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub extra: Extra,
}

/// Phone-home reporting state.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PhoneHomeStatus {
    /// Either `enabled` or `disabled`.
    pub phonehome: String,
}

impl PhoneHomeStatus {
    /// Returns `true` when phone-home reporting is on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.phonehome.eq_ignore_ascii_case("enabled")
    }
}

/// Alert or audit message raised by the array.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Message {
    /// Message identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Message category, such as `array` or `hardware`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Severity at the time of listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_severity: Option<String>,
    /// Short event description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Component that raised the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    /// Time the message was opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened: Option<String>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub extra: Extra,
}

/// Selects which messages to list.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MessageFilter {
    /// Only messages that are still open.
    pub open: bool,
    /// Only messages that have been flagged.
    pub flagged: bool,
}

impl MessageFilter {
    /// Filter for open messages.
    #[must_use]
    pub const fn open() -> Self {
        Self {
            open: true,
            flagged: false,
        }
    }

    /// Filter for flagged messages.
    #[must_use]
    pub const fn flagged() -> Self {
        Self {
            open: false,
            flagged: true,
        }
    }
}

/// Host record with its initiator identifiers.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Host {
    /// Host name.
    pub name: String,
    /// iSCSI qualified names.
    #[serde(default)]
    pub iqn: Vec<String>,
    /// Fibre Channel world wide names.
    #[serde(default)]
    pub wwn: Vec<String>,
    /// Host group the host belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hgroup: Option<String>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub extra: Extra,
}

/// One host/volume pair from the connected-host listing.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HostConnectionRow {
    /// Host name.
    pub name: String,
    /// Volume name.
    pub vol: String,
    /// Logical unit number.
    pub lun: u32,
    /// Array ports the host is currently logged in through.
    #[serde(default)]
    pub target_port: Vec<String>,
}

/// Connection between a host and a volume.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct VolumeConnection {
    /// Host name.
    pub host: String,
    /// Volume name.
    #[serde(alias = "name")]
    pub vol: String,
    /// Logical unit number.
    pub lun: u32,
}

/// Volume record.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Volume {
    /// Volume name.
    pub name: String,
    /// Provisioned size in bytes.
    pub size: u64,
    /// Serial number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Seconds until a destroyed volume is eradicated automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u64>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub extra: Extra,
}
