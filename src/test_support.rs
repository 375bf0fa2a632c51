//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::array::{
    ArrayApi, ArrayError, ArrayFuture, ArrayInfo, Host, HostConnectionRow, Message,
    MessageFilter, PhoneHomeStatus, SpaceInfo, Volume, VolumeConnection,
};

/// A single call made through [`ScriptedArray`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ArrayCall {
    /// `get_basic_info`.
    GetBasicInfo,
    /// `get_space_info`.
    GetSpaceInfo,
    /// `get_phonehome_status`.
    GetPhoneHomeStatus,
    /// `list_messages`.
    ListMessages(MessageFilter),
    /// `list_hosts`.
    ListHosts,
    /// `list_host_connections`.
    ListHostConnections,
    /// `list_volume_connections`.
    ListVolumeConnections(String),
    /// `create_host`.
    CreateHost {
        /// Host name.
        name: String,
        /// iSCSI names.
        iqns: Vec<String>,
        /// Fibre Channel names.
        wwns: Vec<String>,
    },
    /// `delete_host`.
    DeleteHost(String),
    /// `connect_host`.
    ConnectHost {
        /// Host name.
        host: String,
        /// Volume name.
        volume: String,
    },
    /// `disconnect_host`.
    DisconnectHost {
        /// Host name.
        host: String,
        /// Volume name.
        volume: String,
    },
    /// `list_volumes`.
    ListVolumes {
        /// Whether pending volumes were requested.
        pending: bool,
    },
    /// `create_volume`.
    CreateVolume {
        /// Volume name.
        name: String,
        /// Requested size in bytes.
        size_bytes: u64,
    },
    /// `destroy_volume`.
    DestroyVolume(String),
    /// `eradicate_volume`.
    EradicateVolume(String),
}

impl ArrayCall {
    /// Shorthand for [`ArrayCall::DisconnectHost`].
    #[must_use]
    pub fn disconnect(host: &str, volume: &str) -> Self {
        Self::DisconnectHost {
            host: host.to_owned(),
            volume: volume.to_owned(),
        }
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    basic_info: Option<ArrayInfo>,
    space_info: Option<SpaceInfo>,
    phonehome: Option<PhoneHomeStatus>,
    open_messages: Vec<Message>,
    flagged_messages: Vec<Message>,
    hosts: Vec<Host>,
    connection_rows: Vec<HostConnectionRow>,
    volumes: Vec<Volume>,
    pending_volumes: Vec<Volume>,
    volume_connections: Vec<VolumeConnection>,
    failures: Vec<(ArrayCall, ArrayError)>,
    calls: Vec<ArrayCall>,
}

/// Scripted array that serves pre-seeded records and records every call.
///
/// Mutating calls succeed unless a failure was registered for that exact
/// call with [`ScriptedArray::fail_on`]; each registered failure fires once.
#[derive(Clone, Debug, Default)]
pub struct ScriptedArray {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedArray {
    /// Creates an array with no records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ScriptState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Returns a snapshot of all calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ArrayCall> {
        self.with_state(|state| state.calls.clone())
    }

    /// Seeds basic array information.
    pub fn set_basic_info(&self, info: ArrayInfo) {
        self.with_state(|state| state.basic_info = Some(info));
    }

    /// Seeds space information.
    pub fn set_space_info(&self, space: SpaceInfo) {
        self.with_state(|state| state.space_info = Some(space));
    }

    /// Seeds the phone-home status.
    pub fn set_phonehome(&self, enabled: bool) {
        let phonehome = if enabled { "enabled" } else { "disabled" };
        self.with_state(|state| {
            state.phonehome = Some(PhoneHomeStatus {
                phonehome: phonehome.to_owned(),
            });
        });
    }

    /// Seeds the messages returned for open and flagged filters.
    pub fn set_messages(&self, open: Vec<Message>, flagged: Vec<Message>) {
        self.with_state(|state| {
            state.open_messages = open;
            state.flagged_messages = flagged;
        });
    }

    /// Seeds the plain host listing.
    pub fn set_hosts(&self, hosts: Vec<Host>) {
        self.with_state(|state| state.hosts = hosts);
    }

    /// Seeds the connected-host listing.
    pub fn set_connection_rows(&self, rows: Vec<HostConnectionRow>) {
        self.with_state(|state| state.connection_rows = rows);
    }

    /// Seeds live volumes and volumes pending eradication.
    pub fn set_volumes(&self, live: Vec<Volume>, pending: Vec<Volume>) {
        self.with_state(|state| {
            state.volumes = live;
            state.pending_volumes = pending;
        });
    }

    /// Seeds private volume connections.
    pub fn set_volume_connections(&self, connections: Vec<VolumeConnection>) {
        self.with_state(|state| state.volume_connections = connections);
    }

    /// Makes the next matching call fail with `err`.
    pub fn fail_on(&self, call: ArrayCall, err: ArrayError) {
        self.with_state(|state| state.failures.push((call, err)));
    }

    fn record(&self, call: ArrayCall) -> Result<(), ArrayError> {
        self.with_state(|state| {
            state.calls.push(call.clone());
            let position = state
                .failures
                .iter()
                .position(|(candidate, _)| *candidate == call);
            match position {
                Some(index) => Err(state.failures.remove(index).1),
                None => Ok(()),
            }
        })
    }

    fn seeded<T: Clone>(
        &self,
        call: ArrayCall,
        pick: impl FnOnce(&ScriptState) -> Option<T>,
    ) -> Result<T, ArrayError> {
        let description = format!("{call:?}");
        self.record(call)?;
        self.with_state(|state| pick(state))
            .ok_or_else(|| ArrayError::api(404, format!("no scripted response for {description}")))
    }
}

impl ArrayApi for ScriptedArray {
    fn get_basic_info(&self) -> ArrayFuture<'_, ArrayInfo> {
        Box::pin(async move {
            self.seeded(ArrayCall::GetBasicInfo, |state| state.basic_info.clone())
        })
    }

    fn get_space_info(&self) -> ArrayFuture<'_, SpaceInfo> {
        Box::pin(async move {
            self.seeded(ArrayCall::GetSpaceInfo, |state| state.space_info.clone())
        })
    }

    fn get_phonehome_status(&self) -> ArrayFuture<'_, PhoneHomeStatus> {
        Box::pin(async move {
            self.seeded(ArrayCall::GetPhoneHomeStatus, |state| {
                state.phonehome.clone()
            })
        })
    }

    fn list_messages(&self, filter: MessageFilter) -> ArrayFuture<'_, Vec<Message>> {
        Box::pin(async move {
            self.seeded(ArrayCall::ListMessages(filter), |state| {
                let mut messages = Vec::new();
                if filter.open {
                    messages.extend(state.open_messages.iter().cloned());
                }
                if filter.flagged {
                    messages.extend(state.flagged_messages.iter().cloned());
                }
                Some(messages)
            })
        })
    }

    fn list_hosts(&self) -> ArrayFuture<'_, Vec<Host>> {
        Box::pin(async move { self.seeded(ArrayCall::ListHosts, |state| Some(state.hosts.clone())) })
    }

    fn list_host_connections(&self) -> ArrayFuture<'_, Vec<HostConnectionRow>> {
        Box::pin(async move {
            self.seeded(ArrayCall::ListHostConnections, |state| {
                Some(state.connection_rows.clone())
            })
        })
    }

    fn list_volume_connections<'a>(
        &'a self,
        volume: &'a str,
    ) -> ArrayFuture<'a, Vec<VolumeConnection>> {
        Box::pin(async move {
            self.seeded(ArrayCall::ListVolumeConnections(volume.to_owned()), |state| {
                Some(
                    state
                        .volume_connections
                        .iter()
                        .filter(|conn| conn.vol == volume)
                        .cloned()
                        .collect(),
                )
            })
        })
    }

    fn create_host<'a>(
        &'a self,
        name: &'a str,
        iqns: &'a [String],
        wwns: &'a [String],
    ) -> ArrayFuture<'a, Host> {
        Box::pin(async move {
            self.record(ArrayCall::CreateHost {
                name: name.to_owned(),
                iqns: iqns.to_vec(),
                wwns: wwns.to_vec(),
            })?;
            Ok(Host {
                iqn: iqns.to_vec(),
                wwn: wwns.to_vec(),
                ..host(name)
            })
        })
    }

    fn delete_host<'a>(&'a self, name: &'a str) -> ArrayFuture<'a, ()> {
        Box::pin(async move { self.record(ArrayCall::DeleteHost(name.to_owned())) })
    }

    fn connect_host<'a>(
        &'a self,
        host: &'a str,
        volume: &'a str,
    ) -> ArrayFuture<'a, VolumeConnection> {
        Box::pin(async move {
            self.record(ArrayCall::ConnectHost {
                host: host.to_owned(),
                volume: volume.to_owned(),
            })?;
            Ok(VolumeConnection {
                host: host.to_owned(),
                vol: volume.to_owned(),
                lun: 1,
            })
        })
    }

    fn disconnect_host<'a>(&'a self, host: &'a str, volume: &'a str) -> ArrayFuture<'a, ()> {
        Box::pin(async move { self.record(ArrayCall::disconnect(host, volume)) })
    }

    fn list_volumes(&self, pending: bool) -> ArrayFuture<'_, Vec<Volume>> {
        Box::pin(async move {
            self.seeded(ArrayCall::ListVolumes { pending }, |state| {
                let mut volumes = state.volumes.clone();
                if pending {
                    volumes.extend(state.pending_volumes.iter().cloned());
                }
                Some(volumes)
            })
        })
    }

    fn create_volume<'a>(&'a self, name: &'a str, size_bytes: u64) -> ArrayFuture<'a, Volume> {
        Box::pin(async move {
            self.record(ArrayCall::CreateVolume {
                name: name.to_owned(),
                size_bytes,
            })?;
            Ok(volume(name, size_bytes))
        })
    }

    fn destroy_volume<'a>(&'a self, name: &'a str) -> ArrayFuture<'a, ()> {
        Box::pin(async move { self.record(ArrayCall::DestroyVolume(name.to_owned())) })
    }

    fn eradicate_volume<'a>(&'a self, name: &'a str) -> ArrayFuture<'a, ()> {
        Box::pin(async move { self.record(ArrayCall::EradicateVolume(name.to_owned())) })
    }
}

/// Builds a host record with no initiators.
#[must_use]
pub fn host(name: &str) -> Host {
    Host {
        name: name.to_owned(),
        iqn: Vec::new(),
        wwn: Vec::new(),
        hgroup: None,
        extra: std::collections::BTreeMap::new(),
    }
}

/// Builds a volume record.
#[must_use]
pub fn volume(name: &str, size: u64) -> Volume {
    Volume {
        name: name.to_owned(),
        size,
        serial: None,
        created: None,
        time_remaining: None,
        extra: std::collections::BTreeMap::new(),
    }
}

/// Builds a connected-host row.
#[must_use]
pub fn connection_row(host: &str, vol: &str, lun: u32, ports: &[&str]) -> HostConnectionRow {
    HostConnectionRow {
        name: host.to_owned(),
        vol: vol.to_owned(),
        lun,
        target_port: ports.iter().map(|port| (*port).to_owned()).collect(),
    }
}

/// Builds a host/volume connection.
#[must_use]
pub fn connection(host: &str, vol: &str, lun: u32) -> VolumeConnection {
    VolumeConnection {
        host: host.to_owned(),
        vol: vol.to_owned(),
        lun,
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
