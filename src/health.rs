//! Host redundancy classification and the plain-text health report.

use std::fmt::{self, Write as _};

use serde::Serialize;
use tracing::debug;

use crate::array::{
    ArrayApi, ArrayError, ArrayInfo, Message, MessageFilter, PhoneHomeStatus, SpaceInfo,
    VolumeConnection,
};
use crate::hosts::{self, HostRecord};

/// Controller identifiers as they appear in target port names.
pub const CONTROLLERS: [&str; 2] = ["CT0", "CT1"];

const GIB: u64 = 1024 * 1024 * 1024;
const LIST_INDENT: &str = "        ";
const RULE: &str =
    "*******************************************************************************";

/// Connection state of a single host.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Redundancy {
    /// No target ports and no volumes.
    Unused,
    /// Volumes are mapped but the host is not logged in to any port.
    Disconnected,
    /// Logged in, but not through every controller.
    NonRedundant,
    /// Logged in through every controller.
    Redundant,
}

impl Redundancy {
    /// Classifies a host from its target ports and connections.
    #[must_use]
    pub fn of(record: &HostRecord) -> Self {
        if record.target_port.is_empty() {
            if record.connections.is_empty() {
                return Self::Unused;
            }
            return Self::Disconnected;
        }

        let on_every_controller = CONTROLLERS.iter().all(|controller| {
            record
                .target_port
                .iter()
                .any(|port| port.contains(controller))
        });
        if on_every_controller {
            Self::Redundant
        } else {
            Self::NonRedundant
        }
    }
}

/// Hosts partitioned by [`Redundancy`], in input order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HostClassification {
    /// Hosts with no ports and no volumes.
    pub unused: Vec<HostRecord>,
    /// Hosts with volumes but no ports.
    pub disconnected: Vec<HostRecord>,
    /// Hosts missing a port on at least one controller.
    pub non_redundant: Vec<HostRecord>,
    /// Hosts with ports on every controller.
    pub redundant: Vec<HostRecord>,
    /// Connections of every non-redundant host.
    pub at_risk_vols: Vec<VolumeConnection>,
}

impl HostClassification {
    /// Partitions `hosts` in a single pass.
    #[must_use]
    pub fn classify(hosts: &[HostRecord]) -> Self {
        let mut classification = Self::default();
        for record in hosts {
            match Redundancy::of(record) {
                Redundancy::Unused => classification.unused.push(record.clone()),
                Redundancy::Disconnected => classification.disconnected.push(record.clone()),
                Redundancy::NonRedundant => {
                    classification
                        .at_risk_vols
                        .extend(record.connections.iter().cloned());
                    classification.non_redundant.push(record.clone());
                }
                Redundancy::Redundant => classification.redundant.push(record.clone()),
            }
        }
        classification
    }
}

/// Everything the health report shows.
#[derive(Clone, Debug, PartialEq)]
pub struct HealthReport {
    /// Array identity.
    pub info: ArrayInfo,
    /// Capacity metrics.
    pub space: SpaceInfo,
    /// Sum of provisioned sizes of all volumes, including pending ones.
    pub total_provisioned: u64,
    /// Phone-home state.
    pub phonehome: PhoneHomeStatus,
    /// Open messages.
    pub open_messages: Vec<Message>,
    /// Flagged messages.
    pub flagged_messages: Vec<Message>,
    /// Number of hosts on the array.
    pub host_count: usize,
    /// Hosts grouped by connection state.
    pub hosts: HostClassification,
}

impl HealthReport {
    /// Gathers the report from the array.
    ///
    /// # Errors
    ///
    /// Returns the first [`ArrayError`] raised by any listing.
    pub async fn collect<A: ArrayApi + ?Sized>(array: &A) -> Result<Self, ArrayError> {
        let info = array.get_basic_info().await?;
        let space = array.get_space_info().await?;
        let total_provisioned = array
            .list_volumes(true)
            .await?
            .iter()
            .map(|volume| volume.size)
            .fold(0_u64, u64::saturating_add);
        let phonehome = array.get_phonehome_status().await?;
        let open_messages = array.list_messages(MessageFilter::open()).await?;
        let flagged_messages = array.list_messages(MessageFilter::flagged()).await?;
        let all_hosts = hosts::list_with_connections(array).await?;
        let classification = HostClassification::classify(&all_hosts);

        debug!(
            hosts = all_hosts.len(),
            unused = classification.unused.len(),
            disconnected = classification.disconnected.len(),
            non_redundant = classification.non_redundant.len(),
            "classified hosts"
        );

        Ok(Self {
            info,
            space,
            total_provisioned,
            phonehome,
            open_messages,
            flagged_messages,
            host_count: all_hosts.len(),
            hosts: classification,
        })
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        writeln!(out)?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "**  Simple FlashArray Health Report")?;
        writeln!(out, "***********************************")?;
        writeln!(out, "Array Name:     {}", self.info.array_name)?;
        writeln!(out, "Array ID:       {}", self.info.id)?;
        writeln!(out, "Purity Version: {}", self.info.version)?;
        writeln!(out)?;
        writeln!(out, "Current Usage:")?;
        writeln!(out, "    Total Capacity (GB):         {}", gib(self.space.capacity))?;
        writeln!(out, "    Total Used (GB physical):    {}", gib(self.space.total))?;
        writeln!(out, "    Total Provisioned (GB):      {}", gib(self.total_provisioned))?;
        writeln!(out, "    Data Reduction Rate:    {}", self.space.data_reduction)?;
        writeln!(out, "    Total Reduction Rate:   {}", self.space.total_reduction)?;
        writeln!(out)?;
        writeln!(out, "Hosts:")?;
        writeln!(out, "    Number of hosts:                        {}", self.host_count)?;
        writeln!(
            out,
            "    Hosts with redundant connections:       {}",
            self.hosts.redundant.len()
        )?;
        writeln!(out, "    Hosts with no volumes:                  {}", listing(&self.hosts.unused)?)?;
        writeln!(
            out,
            "    Disconnected Hosts:                     {}",
            listing(&self.hosts.disconnected)?
        )?;
        writeln!(
            out,
            "    Hosts with non-redundant connections:   {}",
            listing(&self.hosts.non_redundant)?
        )?;
        writeln!(
            out,
            "    Volumes connections at risk:            {}",
            listing(&self.hosts.at_risk_vols)?
        )?;
        writeln!(out)?;
        writeln!(out, "Messages/Alerts:")?;
        writeln!(out, "    Flagged Message count:  {}", self.flagged_messages.len())?;
        writeln!(out, "    Open Messages:          {}", listing(&self.open_messages)?)?;
        writeln!(out, "    Phone Home:             {}", self.phonehome.phonehome)?;
        writeln!(out)?;
        writeln!(out, "{RULE}")?;
        f.write_str(&out)
    }
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "capacity is reported in fractional GiB for display only"
)]
fn gib(bytes: u64) -> f64 {
    bytes as f64 / GIB as f64
}

/// Renders a collection as indented pretty JSON, or `None` when empty.
fn listing<T: Serialize>(items: &[T]) -> Result<String, fmt::Error> {
    if items.is_empty() {
        return Ok(String::from("None"));
    }
    let pretty = serde_json::to_string_pretty(items).map_err(|_| fmt::Error)?;
    let mut out = String::from("\n");
    for line in pretty.lines() {
        writeln!(out, "{LIST_INDENT}{line}")?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{connection, host};
    use rstest::rstest;

    fn record(name: &str, ports: &[&str], vols: &[&str]) -> HostRecord {
        HostRecord {
            host: host(name),
            connections: vols.iter().map(|vol| connection(name, vol, 1)).collect(),
            target_port: ports.iter().map(|port| (*port).to_owned()).collect(),
        }
    }

    #[rstest]
    #[case(&[], &[], Redundancy::Unused)]
    #[case(&[], &["vol-a"], Redundancy::Disconnected)]
    #[case(&["CT0.FC1"], &["vol-a"], Redundancy::NonRedundant)]
    #[case(&["CT1.ETH4"], &[], Redundancy::NonRedundant)]
    #[case(&["CT0.FC0", "CT1.FC0"], &["vol-a"], Redundancy::Redundant)]
    #[case(&["CT0.FC0", "CT0.FC1", "CT1.FC1"], &[], Redundancy::Redundant)]
    fn classifies_single_host(
        #[case] ports: &[&str],
        #[case] vols: &[&str],
        #[case] expected: Redundancy,
    ) {
        assert_eq!(Redundancy::of(&record("h", ports, vols)), expected);
    }

    #[rstest]
    fn non_redundant_connections_are_at_risk() {
        let hosts = vec![
            record("idle", &[], &[]),
            record("orphan", &[], &["vol-o"]),
            record("single", &["CT0.FC1"], &["vol-a", "vol-b"]),
            record("dual", &["CT0.FC0", "CT1.FC0"], &["vol-c"]),
            record("other", &["CT1.FC2"], &["vol-d"]),
        ];

        let classification = HostClassification::classify(&hosts);

        let names = |records: &[HostRecord]| -> Vec<String> {
            records.iter().map(|r| r.name().to_owned()).collect()
        };
        assert_eq!(names(&classification.unused), ["idle"]);
        assert_eq!(names(&classification.disconnected), ["orphan"]);
        assert_eq!(names(&classification.non_redundant), ["single", "other"]);
        assert_eq!(names(&classification.redundant), ["dual"]);
        assert_eq!(
            classification.at_risk_vols,
            vec![
                connection("single", "vol-a", 1),
                connection("single", "vol-b", 1),
                connection("other", "vol-d", 1),
            ]
        );
    }

    #[rstest]
    fn listing_indents_pretty_json() {
        let rendered = listing(&[connection("h1", "v1", 1)]).expect("render");
        assert!(rendered.starts_with('\n'));
        assert!(rendered.contains("        \"vol\": \"v1\""), "rendered: {rendered}");
        assert_eq!(listing::<VolumeConnection>(&[]).expect("render"), "None");
    }

    #[rstest]
    fn gib_converts_binary_gigabytes() {
        assert_eq!(gib(3 * GIB).to_string(), "3");
        assert_eq!(gib(GIB + 512 * 1024 * 1024).to_string(), "1.5");
    }
}
