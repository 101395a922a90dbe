//! check-ubnt-firmware: compare a UniFi AP's firmware with the latest release.

use clap::Parser;
use std::process::ExitCode;

use snmp_probe::cli::args::{OutputArgs, SnmpArgs};
use snmp_probe::firmware::{
    UNIFI_RELEASES_URL, compare_firmware, fetch_latest_version, http_client, normalize_version,
};
use snmp_probe::project::project_scalar;
use snmp_probe::verdict::{Report, unknown_exit};
use snmp_probe::{Error, NameRegistry, SecurityProfile, get_scalar, oid};

/// Warn when a UniFi access point is not running the latest release firmware.
#[derive(Debug, Parser)]
#[command(name = "check-ubnt-firmware", version, about)]
struct Args {
    #[command(flatten)]
    snmp: SnmpArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Firmware listing endpoint.
    #[arg(long, default_value = UNIFI_RELEASES_URL)]
    url: String,

    /// Service name printed in the status line.
    #[arg(long, default_value = "UniFi Firmware")]
    service: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.output.init_tracing();

    match run(&args).await {
        Ok(report) => report.emit(),
        Err(e) => unknown_exit(&args.service, e).emit(),
    }
}

async fn run(args: &Args) -> snmp_probe::Result<Report> {
    let config = args.snmp.configuration();
    config.validate()?;
    let profile = SecurityProfile::build(&config, args.snmp.snmp_version)?;
    let engine = args.snmp.engine();

    // unifiApSystemVersion.0, unifiApSystemModel.0
    let oids = [
        oid!(1, 3, 6, 1, 4, 1, 41112, 1, 6, 3, 6, 0),
        oid!(1, 3, 6, 1, 4, 1, 41112, 1, 6, 3, 3, 0),
    ];
    let bindings = get_scalar(&engine, &config, &profile, &oids).await?;
    let record = project_scalar(&NameRegistry::new(), &bindings, "unifiApSystem", false);

    let field = |label: &str| {
        record
            .get(label)
            .map(ToString::to_string)
            .ok_or_else(|| Error::Firmware {
                message: format!("Device did not report {}", label),
            })
    };
    let installed = field("unifiApSystemVersion")?;
    let model = field("unifiApSystemModel")?;

    let client = http_client()?;
    let latest = fetch_latest_version(&client, &args.url, &model).await?;
    Ok(compare_firmware(
        &installed,
        &normalize_version(&latest),
        &args.service,
    ))
}
