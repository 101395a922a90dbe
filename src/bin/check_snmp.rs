//! check-snmp: Nagios-style threshold check on SNMP values.
//!
//! Reads scalars (GET) or table columns (GETNEXT walk), keys the values by
//! MIB label and compares every numeric value against `-w` / `-c`.

use clap::Parser;
use std::process::ExitCode;

use snmp_probe::cli::args::{OutputArgs, SnmpArgs};
use snmp_probe::project::{Field, Record, project_scalar, project_table};
use snmp_probe::verdict::{Report, Verdict, unknown_exit};
use snmp_probe::{NameRegistry, Oid, SecurityProfile, Value, get_scalar, get_table};

/// Check SNMP values against warning and critical thresholds.
#[derive(Debug, Parser)]
#[command(name = "check-snmp", version, about)]
struct Args {
    #[command(flatten)]
    snmp: SnmpArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Only report values whose MIB label starts with this prefix.
    #[arg(short = 'l', long = "label", default_value = "")]
    label: String,

    /// Walk the given columns instead of reading scalars.
    #[arg(long)]
    table: bool,

    /// Values are UCD-SNMP opaque floats.
    #[arg(long)]
    float: bool,

    /// Warning when a value reaches this threshold.
    #[arg(short = 'w', long = "warning")]
    warning: Option<f64>,

    /// Critical when a value reaches this threshold.
    #[arg(short = 'c', long = "critical")]
    critical: Option<f64>,

    /// Service name printed in the status line.
    #[arg(long, default_value = "SNMP")]
    service: String,

    /// OIDs to read (dotted notation or MIB names).
    #[arg(required = true, value_name = "OID")]
    oids: Vec<String>,
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
    let registry = NameRegistry::new();
    let oids = args
        .oids
        .iter()
        .map(|s| registry.parse(s))
        .collect::<snmp_probe::Result<Vec<Oid>>>()?;

    let config = args.snmp.configuration();
    config.validate()?;
    let profile = SecurityProfile::build(&config, args.snmp.snmp_version)?;
    let engine = args.snmp.engine();

    let records = if args.table {
        let rows = get_table(&engine, &config, &profile, &oids).await?;
        project_table(&registry, &rows, &args.label)
    } else {
        let bindings = get_scalar(&engine, &config, &profile, &oids).await?;
        vec![project_scalar(&registry, &bindings, &args.label, false)]
    };

    evaluate(args, &records)
}

/// Numeric value of a field.
fn numeric(field: &Field, float: bool) -> snmp_probe::Result<Option<f64>> {
    if float {
        return Ok(Some(f64::from(field.to_float()?)));
    }
    Ok(field.as_text().and_then(|text| text.trim().parse().ok()))
}

/// Worst verdict over every value, with one `label=value` entry per value.
fn evaluate(args: &Args, records: &[Record]) -> snmp_probe::Result<Report> {
    let mut verdict = Verdict::Ok;
    let mut entries = Vec::new();
    let table = records.len() > 1;

    // columns that ran out before the others
    let exhausted = Field::Text(Value::EndOfMibView.to_string());

    for (row, record) in records.iter().enumerate() {
        for (label, field) in record.iter().filter(|(_, field)| **field != exhausted) {
            let key = if table {
                format!("{}[{}]", label, row + 1)
            } else {
                label.clone()
            };

            match numeric(field, args.float)? {
                Some(value) => {
                    let state = if args.critical.is_some_and(|c| value >= c) {
                        Verdict::Critical
                    } else if args.warning.is_some_and(|w| value >= w) {
                        Verdict::Warning
                    } else {
                        Verdict::Ok
                    };
                    verdict = worse(verdict, state);
                    entries.push(format!("{}={}", key, value));
                }
                None if args.warning.is_some() || args.critical.is_some() => {
                    return Ok(unknown_exit(
                        &args.service,
                        format!("{} is not numeric: {}", key, field),
                    ));
                }
                None => entries.push(format!("{}={}", key, field)),
            }
        }
    }

    if entries.is_empty() {
        return Ok(unknown_exit(
            &args.service,
            format!("No values matched label {:?}", args.label),
        ));
    }

    Ok(Report::new(
        verdict,
        format!("{} {} - {}", args.service, verdict, entries.join(", ")),
    ))
}

fn worse(a: Verdict, b: Verdict) -> Verdict {
    let rank = |v: Verdict| match v {
        Verdict::Ok => 0,
        Verdict::Warning => 1,
        Verdict::Unknown => 2,
        Verdict::Critical => 3,
    };
    if rank(b) > rank(a) { b } else { a }
}
