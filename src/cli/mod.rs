//! Command-line interface definitions for the `flashctl` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Top-level CLI for the `flashctl` binary.
#[derive(Debug, Parser)]
#[command(
    name = "flashctl",
    about = "Inspect and maintain a storage array through its management API",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Target array management IP or hostname.
    #[arg(short = 't', long, env = "FLASHCTL_TARGET")]
    pub(crate) target: String,
    /// Username for management access to the array.
    #[arg(short = 'u', long, env = "FLASHCTL_USERNAME")]
    pub(crate) username: String,
    /// Password for management access to the array.
    #[arg(short = 'p', long, env = "FLASHCTL_PASSWORD", hide_env_values = true)]
    pub(crate) password: String,
    /// Skip TLS certificate verification for arrays with self-signed
    /// certificates.
    #[arg(long)]
    pub(crate) insecure: bool,
    /// Increase log verbosity (repeat for more detail).
    #[arg(long = "verbose", action = ArgAction::Count)]
    pub(crate) verbose: u8,
    /// Operation to run.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Operations offered by `flashctl`.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print basic and space information about the array.
    #[command(name = "info")]
    Info,
    /// List, create, delete, or connect hosts.
    #[command(name = "hosts")]
    Hosts(HostsCommand),
    /// List, create, destroy, or eradicate volumes.
    #[command(name = "volumes")]
    Volumes(VolumesCommand),
    /// Print a health report covering capacity, host redundancy and alerts.
    #[command(name = "health")]
    Health,
}

/// Actions available under `flashctl hosts`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum HostAction {
    /// List hosts with their connections.
    List,
    /// Create a host.
    Create,
    /// Delete a host.
    Delete,
    /// Connect a host to a volume.
    Connect,
}

/// Arguments for `flashctl hosts`.
#[derive(Debug, Args)]
pub(crate) struct HostsCommand {
    /// The action to run.
    #[arg(value_enum)]
    pub(crate) action: HostAction,
    /// Name of the host to be operated on or created.
    #[arg(short = 'n', long)]
    pub(crate) name: Option<String>,
    /// iSCSI IQNs to associate with the host being created.
    #[arg(short = 'i', long = "iqnlist", value_name = "IQN", num_args = 0..)]
    pub(crate) iqnlist: Vec<String>,
    /// Fibre Channel WWNs to associate with the host being created.
    #[arg(short = 'w', long = "wwnlist", value_name = "WWN", num_args = 0..)]
    pub(crate) wwnlist: Vec<String>,
    /// Name of the volume to attach to the host.
    #[arg(short = 'v', long = "vol_name", visible_alias = "vol-name")]
    pub(crate) vol_name: Option<String>,
}

/// Actions available under `flashctl volumes`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum VolumeAction {
    /// List volumes.
    List,
    /// Create a volume.
    Create,
    /// Destroy a volume, leaving it pending eradication.
    Destroy,
    /// Permanently remove a destroyed volume.
    Eradicate,
    /// Disconnect all hosts, then destroy and eradicate the volume.
    #[value(name = "smarter_delete", alias = "smarter-delete")]
    SmarterDelete,
}

/// Arguments for `flashctl volumes`.
#[derive(Debug, Args)]
pub(crate) struct VolumesCommand {
    /// The action to run.
    #[arg(value_enum)]
    pub(crate) action: VolumeAction,
    /// Name of the volume to be operated on or created.
    #[arg(short = 'n', long)]
    pub(crate) name: Option<String>,
    /// Size of the volume to be created, in bytes or with a K, M, G, T or P
    /// suffix (for example `10G`).
    #[arg(short = 's', long)]
    pub(crate) size: Option<String>,
    /// Include volumes pending eradication when listing.
    #[arg(long)]
    pub(crate) pending: bool,
}
