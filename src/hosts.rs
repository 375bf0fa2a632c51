//! Host listing and management.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::array::{ArrayApi, ArrayError, Host, HostConnectionRow, VolumeConnection};

/// A host together with its volume connections and the array ports it is
/// logged in through.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HostRecord {
    /// The host as listed by the array.
    #[serde(flatten)]
    pub host: Host,
    /// Volumes connected to the host.
    pub connections: Vec<VolumeConnection>,
    /// Array ports the host is currently logged in through.
    pub target_port: Vec<String>,
}

impl HostRecord {
    /// Wraps a host with no connections.
    #[must_use]
    pub const fn unconnected(host: Host) -> Self {
        Self {
            host,
            connections: Vec::new(),
            target_port: Vec::new(),
        }
    }

    /// Host name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.host.name
    }
}

/// Lists every host with its connections and target ports.
///
/// The connected-host listing repeats each host once per volume; rows are
/// folded into the matching host record. Hosts keep the order of the plain
/// listing.
///
/// # Errors
///
/// Returns [`ArrayError`] when either listing fails.
pub async fn list_with_connections<A: ArrayApi + ?Sized>(
    array: &A,
) -> Result<Vec<HostRecord>, ArrayError> {
    let hosts = array.list_hosts().await?;
    let rows = array.list_host_connections().await?;
    debug!(
        hosts = hosts.len(),
        connections = rows.len(),
        "fetched host listings"
    );
    Ok(merge_connections(hosts, rows))
}

/// Folds connected-host rows into host records.
#[must_use]
pub fn merge_connections(hosts: Vec<Host>, rows: Vec<HostConnectionRow>) -> Vec<HostRecord> {
    let mut records: Vec<HostRecord> = hosts.into_iter().map(HostRecord::unconnected).collect();
    let index: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(position, record)| (record.host.name.clone(), position))
        .collect();

    for row in rows {
        let Some(record) = index
            .get(&row.name)
            .and_then(|position| records.get_mut(*position))
        else {
            debug!(host = %row.name, "connection row for unknown host ignored");
            continue;
        };
        record.connections.push(VolumeConnection {
            host: row.name,
            vol: row.vol,
            lun: row.lun,
        });
        record.target_port = row.target_port;
    }

    records
}

/// Creates a host with the given initiators.
///
/// # Errors
///
/// Returns [`ArrayError`] when the array rejects the request.
pub async fn create<A: ArrayApi + ?Sized>(
    array: &A,
    name: &str,
    iqns: &[String],
    wwns: &[String],
) -> Result<Host, ArrayError> {
    info!(host = name, iqns = iqns.len(), wwns = wwns.len(), "creating host");
    array.create_host(name, iqns, wwns).await
}

/// Deletes a host.
///
/// # Errors
///
/// Returns [`ArrayError`] when the array rejects the request.
pub async fn delete<A: ArrayApi + ?Sized>(array: &A, name: &str) -> Result<(), ArrayError> {
    info!(host = name, "deleting host");
    array.delete_host(name).await
}

/// Connects a host to a volume.
///
/// # Errors
///
/// Returns [`ArrayError`] when the array rejects the request.
pub async fn connect_with_volume<A: ArrayApi + ?Sized>(
    array: &A,
    host: &str,
    volume: &str,
) -> Result<VolumeConnection, ArrayError> {
    info!(host, volume, "connecting host to volume");
    array.connect_host(host, volume).await
}
