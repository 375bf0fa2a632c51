//! Array client abstraction for the storage array management API.
//!
//! [`ArrayApi`] is the seam between the maintenance policies in this crate
//! and the array itself. [`RestArray`] talks to a real array over HTTPS;
//! tests substitute [`crate::test_support::ScriptedArray`].

mod error;
pub mod rest;
mod types;

use std::future::Future;
use std::pin::Pin;

pub use error::ArrayError;
pub use rest::{Credentials, RestArray};
pub use types::{
    ArrayInfo, Host, HostConnectionRow, Message, MessageFilter, PhoneHomeStatus, SpaceInfo,
    Volume, VolumeConnection,
};

/// Future returned by array operations.
pub type ArrayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ArrayError>> + Send + 'a>>;

/// Operations the maintenance commands need from an array.
///
/// Every call is a single request against the array; implementations do not
/// retry.
pub trait ArrayApi {
    /// Returns the array name, identifier and software version.
    fn get_basic_info(&self) -> ArrayFuture<'_, ArrayInfo>;

    /// Returns capacity and data-reduction metrics.
    fn get_space_info(&self) -> ArrayFuture<'_, SpaceInfo>;

    /// Returns whether phone-home reporting is enabled.
    fn get_phonehome_status(&self) -> ArrayFuture<'_, PhoneHomeStatus>;

    /// Lists alert messages matching the filter.
    fn list_messages(&self, filter: MessageFilter) -> ArrayFuture<'_, Vec<Message>>;

    /// Lists every host record.
    fn list_hosts(&self) -> ArrayFuture<'_, Vec<Host>>;

    /// Lists one row per connected host/volume pair, including the target
    /// ports the host is logged in through.
    fn list_host_connections(&self) -> ArrayFuture<'_, Vec<HostConnectionRow>>;

    /// Lists hosts privately connected to the named volume.
    fn list_volume_connections<'a>(
        &'a self,
        volume: &'a str,
    ) -> ArrayFuture<'a, Vec<VolumeConnection>>;

    /// Creates a host with the given initiator identifiers.
    fn create_host<'a>(
        &'a self,
        name: &'a str,
        iqns: &'a [String],
        wwns: &'a [String],
    ) -> ArrayFuture<'a, Host>;

    /// Deletes a host record.
    fn delete_host<'a>(&'a self, name: &'a str) -> ArrayFuture<'a, ()>;

    /// Connects a host to a volume.
    fn connect_host<'a>(
        &'a self,
        host: &'a str,
        volume: &'a str,
    ) -> ArrayFuture<'a, VolumeConnection>;

    /// Removes the connection between a host and a volume.
    fn disconnect_host<'a>(&'a self, host: &'a str, volume: &'a str) -> ArrayFuture<'a, ()>;

    /// Lists volumes; `pending` includes destroyed volumes awaiting
    /// eradication.
    fn list_volumes(&self, pending: bool) -> ArrayFuture<'_, Vec<Volume>>;

    /// Creates a volume of `size_bytes`.
    fn create_volume<'a>(&'a self, name: &'a str, size_bytes: u64) -> ArrayFuture<'a, Volume>;

    /// Soft-deletes a volume, leaving it pending eradication.
    fn destroy_volume<'a>(&'a self, name: &'a str) -> ArrayFuture<'a, ()>;

    /// Permanently removes a destroyed volume.
    fn eradicate_volume<'a>(&'a self, name: &'a str) -> ArrayFuture<'a, ()>;
}
