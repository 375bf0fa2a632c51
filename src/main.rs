//! Binary entry point for the `flashctl` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use flashctl::{
    ArrayApi, ArrayConfig, ArrayError, ConfigError, Credentials, HealthReport, RestArray,
    SizeParseError, hosts, logging, volumes,
};

mod cli;

use cli::{Cli, Command, HostAction, HostsCommand, VolumeAction, VolumesCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Size(#[from] SizeParseError),
    #[error(transparent)]
    Array(#[from] ArrayError),
    #[error("failed to write output: {0}")]
    Output(String),
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        Self::Output(value.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value.to_string())
    }
}

/// A fully validated request, ready to run against the array.
#[derive(Debug, Eq, PartialEq)]
enum Operation {
    Info,
    ListHosts,
    CreateHost {
        name: String,
        iqns: Vec<String>,
        wwns: Vec<String>,
    },
    DeleteHost(String),
    ConnectHost {
        host: String,
        volume: String,
    },
    ListVolumes {
        pending: bool,
    },
    CreateVolume {
        name: String,
        size_bytes: u64,
    },
    DestroyVolume(String),
    EradicateVolume(String),
    SmarterDelete(String),
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    logging::init(cli.verbose).map_err(|err| CliError::Logging(err.to_string()))?;

    let operation = plan(cli.command)?;

    let config = ArrayConfig::load_without_cli_args()?.with_insecure(cli.insecure);
    config.validate()?;

    let credentials = Credentials::new(cli.username, cli.password);
    let array = RestArray::connect(&cli.target, &credentials, &config).await?;

    let result = execute(&array, operation, &mut io::stdout()).await;
    if let Err(err) = array.close().await {
        warn!(%err, "failed to close array session");
    }
    result
}

fn plan(command: Command) -> Result<Operation, CliError> {
    match command {
        Command::Info => Ok(Operation::Info),
        Command::Health => Ok(Operation::Health),
        Command::Hosts(args) => plan_hosts(args),
        Command::Volumes(args) => plan_volumes(args),
    }
}

fn plan_hosts(args: HostsCommand) -> Result<Operation, CliError> {
    match args.action {
        HostAction::List => Ok(Operation::ListHosts),
        HostAction::Create => Ok(Operation::CreateHost {
            name: required(args.name, "hosts create", "--name")?,
            iqns: args.iqnlist,
            wwns: args.wwnlist,
        }),
        HostAction::Delete => Ok(Operation::DeleteHost(required(
            args.name,
            "hosts delete",
            "--name",
        )?)),
        HostAction::Connect => Ok(Operation::ConnectHost {
            host: required(args.name, "hosts connect", "--name")?,
            volume: required(args.vol_name, "hosts connect", "--vol_name")?,
        }),
    }
}

fn plan_volumes(args: VolumesCommand) -> Result<Operation, CliError> {
    match args.action {
        VolumeAction::List => Ok(Operation::ListVolumes {
            pending: args.pending,
        }),
        VolumeAction::Create => {
            let name = required(args.name, "volumes create", "--name")?;
            let size = required(args.size, "volumes create", "--size")?;
            Ok(Operation::CreateVolume {
                name,
                size_bytes: volumes::parse_size(&size)?,
            })
        }
        VolumeAction::Destroy => Ok(Operation::DestroyVolume(required(
            args.name,
            "volumes destroy",
            "--name",
        )?)),
        VolumeAction::Eradicate => Ok(Operation::EradicateVolume(required(
            args.name,
            "volumes eradicate",
            "--name",
        )?)),
        VolumeAction::SmarterDelete => Ok(Operation::SmarterDelete(required(
            args.name,
            "volumes smarter_delete",
            "--name",
        )?)),
    }
}

fn required(value: Option<String>, action: &str, flag: &str) -> Result<String, CliError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(CliError::Usage(format!("{action} requires {flag}"))),
    }
}

async fn execute<A, W>(array: &A, operation: Operation, out: &mut W) -> Result<(), CliError>
where
    A: ArrayApi + ?Sized,
    W: Write,
{
    match operation {
        Operation::Health => {
            let report = HealthReport::collect(array).await?;
            write!(out, "{report}")?;
        }
        Operation::Info => {
            writeln!(out)?;
            let basic = array.get_basic_info().await?;
            let space = array.get_space_info().await?;
            writeln!(out, "Basic info (raw):")?;
            write_pretty(out, &basic)?;
            writeln!(out)?;
            writeln!(out, "Space info (raw):")?;
            write_pretty(out, &space)?;
            writeln!(out)?;
            write_done(out)?;
        }
        Operation::ListHosts => {
            writeln!(out)?;
            for record in hosts::list_with_connections(array).await? {
                writeln!(out, "Details for host \"{}\"", record.name())?;
                write_pretty(out, &record)?;
                writeln!(out)?;
            }
            write_done(out)?;
        }
        Operation::CreateHost { name, iqns, wwns } => {
            writeln!(out)?;
            writeln!(
                out,
                "Creating host {name} with iqnlist {iqns:?} and wwnlist {wwns:?}.."
            )?;
            let host = hosts::create(array, &name, &iqns, &wwns).await?;
            writeln!(out, "New host:")?;
            write_pretty(out, &host)?;
            write_done(out)?;
        }
        Operation::DeleteHost(name) => {
            writeln!(out)?;
            writeln!(out, "Deleting host {name}...")?;
            hosts::delete(array, &name).await?;
            write_done(out)?;
        }
        Operation::ConnectHost { host, volume } => {
            writeln!(out)?;
            writeln!(out, "Connecting host {host} to volume {volume}...")?;
            hosts::connect_with_volume(array, &host, &volume).await?;
            write_done(out)?;
        }
        Operation::ListVolumes { pending } => {
            writeln!(out)?;
            for volume in volumes::list_all(array, pending).await? {
                writeln!(out, "Details for volume \"{}\"", volume.name)?;
                write_pretty(out, &volume)?;
                writeln!(out)?;
            }
            write_done(out)?;
        }
        Operation::CreateVolume { name, size_bytes } => {
            writeln!(out)?;
            writeln!(out, "Creating volume {name} with size {size_bytes}..")?;
            let volume = volumes::create(array, &name, size_bytes).await?;
            writeln!(out, "New volume:")?;
            write_pretty(out, &volume)?;
            write_done(out)?;
        }
        Operation::DestroyVolume(name) => {
            writeln!(out)?;
            writeln!(out, "Destroying volume {name}...")?;
            volumes::destroy(array, &name).await?;
            write_done(out)?;
        }
        Operation::EradicateVolume(name) => {
            writeln!(out)?;
            writeln!(out, "Eradicating volume {name}...")?;
            volumes::eradicate(array, &name).await?;
            write_done(out)?;
        }
        Operation::SmarterDelete(name) => {
            writeln!(out)?;
            writeln!(
                out,
                "Clearing host connections and then destroying/eradicating volume {name}..."
            )?;
            volumes::smarter_delete(array, &name).await?;
            write_done(out)?;
        }
    }
    Ok(())
}

fn write_done<W: Write>(out: &mut W) -> Result<(), CliError> {
    writeln!(out, "Done!")?;
    writeln!(out)?;
    Ok(())
}

fn write_pretty<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "error: {err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashctl::test_support::{ArrayCall, ScriptedArray, connection, host, volume};
    use rstest::rstest;

    fn hosts_args(action: HostAction) -> HostsCommand {
        HostsCommand {
            action,
            name: None,
            iqnlist: Vec::new(),
            wwnlist: Vec::new(),
            vol_name: None,
        }
    }

    fn volumes_args(action: VolumeAction) -> VolumesCommand {
        VolumesCommand {
            action,
            name: None,
            size: None,
            pending: false,
        }
    }

    async fn render(array: &ScriptedArray, operation: Operation) -> (Result<(), CliError>, String) {
        let mut buf = Vec::new();
        let result = execute(array, operation, &mut buf).await;
        (result, String::from_utf8(buf).expect("utf8"))
    }

    #[rstest]
    #[case(Command::Hosts(hosts_args(HostAction::Create)), "hosts create requires --name")]
    #[case(Command::Hosts(hosts_args(HostAction::Delete)), "hosts delete requires --name")]
    #[case(Command::Volumes(volumes_args(VolumeAction::Destroy)), "volumes destroy requires --name")]
    #[case(
        Command::Volumes(volumes_args(VolumeAction::SmarterDelete)),
        "volumes smarter_delete requires --name"
    )]
    fn plan_rejects_missing_names(#[case] command: Command, #[case] expected: &str) {
        let err = plan(command).expect_err("plan should fail");
        assert!(
            matches!(err, CliError::Usage(ref message) if message == expected),
            "unexpected error: {err}"
        );
    }

    #[rstest]
    fn plan_connect_requires_volume() {
        let args = HostsCommand {
            name: Some(String::from("esx-01")),
            ..hosts_args(HostAction::Connect)
        };
        let err = plan(Command::Hosts(args)).expect_err("plan should fail");
        assert_eq!(err.to_string(), "hosts connect requires --vol_name");
    }

    #[rstest]
    fn plan_create_volume_parses_size() {
        let args = VolumesCommand {
            name: Some(String::from("vol-a")),
            size: Some(String::from("1G")),
            ..volumes_args(VolumeAction::Create)
        };
        assert_eq!(
            plan(Command::Volumes(args)).expect("plan"),
            Operation::CreateVolume {
                name: String::from("vol-a"),
                size_bytes: 1_073_741_824,
            }
        );
    }

    #[rstest]
    fn plan_create_volume_rejects_bad_size() {
        let args = VolumesCommand {
            name: Some(String::from("vol-a")),
            size: Some(String::from("lots")),
            ..volumes_args(VolumeAction::Create)
        };
        let err = plan(Command::Volumes(args)).expect_err("plan should fail");
        assert!(matches!(err, CliError::Size(SizeParseError::Invalid(_))));
    }

    #[tokio::test]
    async fn execute_lists_volumes_with_headings() {
        let array = ScriptedArray::new();
        array.set_volumes(vec![volume("vol-a", 1024)], vec![volume("vol-old", 512)]);

        let (result, output) = render(&array, Operation::ListVolumes { pending: true }).await;

        assert!(result.is_ok(), "result: {result:?}");
        assert!(output.contains("Details for volume \"vol-a\""), "output: {output}");
        assert!(output.contains("Details for volume \"vol-old\""), "output: {output}");
        assert!(output.ends_with("Done!\n\n"), "output: {output}");
    }

    #[tokio::test]
    async fn execute_smarter_delete_reports_progress() {
        let array = ScriptedArray::new();
        array.set_volume_connections(vec![connection("esx-01", "vol-a", 1)]);

        let (result, output) = render(&array, Operation::SmarterDelete(String::from("vol-a"))).await;

        assert!(result.is_ok(), "result: {result:?}");
        assert!(output.contains("destroying/eradicating volume vol-a"));
        assert!(array.calls().contains(&ArrayCall::disconnect("esx-01", "vol-a")));
    }

    #[tokio::test]
    async fn execute_surfaces_array_errors() {
        let array = ScriptedArray::new();
        array.fail_on(
            ArrayCall::DeleteHost(String::from("esx-01")),
            ArrayError::api(400, "Host has connected volumes."),
        );

        let (result, output) = render(&array, Operation::DeleteHost(String::from("esx-01"))).await;

        assert!(matches!(result, Err(CliError::Array(ArrayError::Api { status: 400, .. }))));
        assert!(!output.contains("Done!"), "output: {output}");
    }

    #[tokio::test]
    async fn execute_lists_hosts_with_connections() {
        let array = ScriptedArray::new();
        array.set_hosts(vec![host("esx-01")]);

        let (result, output) = render(&array, Operation::ListHosts).await;

        assert!(result.is_ok(), "result: {result:?}");
        assert!(output.contains("Details for host \"esx-01\""), "output: {output}");
        assert!(output.contains("\"target_port\": []"), "output: {output}");
    }

    #[tokio::test]
    async fn execute_health_prints_only_the_report() {
        let array = ScriptedArray::new();
        array.set_basic_info(
            serde_json::from_value(serde_json::json!({
                "array_name": "pure01",
                "id": "a1b2c3",
                "version": "5.3.10",
            }))
            .expect("array info"),
        );
        array.set_space_info(
            serde_json::from_value(serde_json::json!({"capacity": 1024, "total": 512}))
                .expect("space info"),
        );
        array.set_volumes(Vec::new(), Vec::new());
        array.set_phonehome(false);
        array.set_hosts(vec![host("esx-01")]);

        let (result, output) = render(&array, Operation::Health).await;

        assert!(result.is_ok(), "result: {result:?}");
        assert!(output.contains("Array Name:     pure01"), "output: {output}");
        assert!(output.contains("Phone Home:             disabled"), "output: {output}");
        assert!(!output.contains("Done!"), "output: {output}");
    }

    #[tokio::test]
    async fn execute_delete_host_finishes_with_done() {
        let array = ScriptedArray::new();

        let (result, output) = render(&array, Operation::DeleteHost(String::from("esx-01"))).await;

        assert!(result.is_ok(), "result: {result:?}");
        assert_eq!(output, "\nDeleting host esx-01...\nDone!\n\n");
    }

    #[test]
    fn write_error_prefixes_message() {
        let mut buf = Vec::new();
        write_error(&mut buf, &CliError::Usage(String::from("hosts delete requires --name")));
        let rendered = String::from_utf8(buf).expect("utf8");
        assert_eq!(rendered, "error: hosts delete requires --name\n");
    }
}
