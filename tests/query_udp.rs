//! End-to-end queries against a local UDP agent.

mod common;

use common::*;
use snmp_probe::project::{project_scalar, project_table};
use snmp_probe::verdict::{Verdict, report, unknown_exit};
use snmp_probe::version::CommunityVersion;
use snmp_probe::{
    Error, ErrorStatus, NameRegistry, SecurityProfile, SnmpEngine, Value, get_scalar, get_table,
};
use std::time::Duration;

fn engine() -> SnmpEngine {
    SnmpEngine::new()
        .with_timeout(Duration::from_millis(200))
        .with_retries(1)
}

fn profile(version: CommunityVersion) -> SecurityProfile {
    let config = local_config(0);
    SecurityProfile::build(&config, version).unwrap()
}

#[tokio::test]
async fn scalar_get_returns_bindings_in_request_order() {
    let agent = TestAgent::spawn(sample_mib(), AgentBehavior::default()).await;
    let config = local_config(agent.port());

    let bindings = get_scalar(
        &engine(),
        &config,
        &profile(CommunityVersion::V2c),
        &[sys_name(), sys_location()],
    )
    .await
    .unwrap();

    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].oid, sys_name());
    assert_eq!(bindings[0].value.as_str(), Some("ap-lobby"));
    assert_eq!(bindings[1].value.as_str(), Some("Lobby"));
}

#[tokio::test]
async fn scalar_missing_object_is_not_an_error_on_v2c() {
    let agent = TestAgent::spawn(sample_mib(), AgentBehavior::default()).await;
    let config = local_config(agent.port());
    let missing = snmp_probe::oid!(1, 3, 6, 1, 99, 99, 0);

    let bindings = get_scalar(&engine(), &config, &profile(CommunityVersion::V2c), &[missing])
        .await
        .unwrap();
    assert_eq!(bindings[0].value, Value::NoSuchObject);
}

#[tokio::test]
async fn scalar_missing_object_on_v1_is_agent_error() {
    let agent = TestAgent::spawn(sample_mib(), AgentBehavior::default()).await;
    let config = local_config(agent.port());
    let missing = snmp_probe::oid!(1, 3, 6, 1, 99, 99, 0);

    let err = get_scalar(
        &engine(),
        &config,
        &profile(CommunityVersion::V1),
        &[sys_name(), missing],
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Agent {
            status: ErrorStatus::NoSuchName,
            ..
        }
    ));
    assert_eq!(err.to_string(), "noSuchName at 1.3.6.1.99.99.0");
}

#[tokio::test]
async fn agent_error_status_names_offending_oid() {
    let behavior = AgentBehavior {
        fail_with: Some((5, 2)),
        ..Default::default()
    };
    let agent = TestAgent::spawn(sample_mib(), behavior).await;
    let config = local_config(agent.port());

    let err = get_scalar(
        &engine(),
        &config,
        &profile(CommunityVersion::V2c),
        &[sys_descr(), sys_name()],
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "genErr at 1.3.6.1.2.1.1.5.0");
}

#[tokio::test]
async fn table_walk_yields_one_row_per_index() {
    let agent = TestAgent::spawn(sample_mib(), AgentBehavior::default()).await;
    let config = local_config(agent.port());

    let rows = get_table(
        &engine(),
        &config,
        &profile(CommunityVersion::V2c),
        &[if_column(2), if_column(8)],
    )
    .await
    .unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][0].oid, if_column(2).child(2));
    assert_eq!(rows[1][0].value.as_str(), Some("eth0"));
    assert_eq!(rows[2][1].value, Value::Integer(2));
}

#[tokio::test]
async fn table_walk_ends_on_v1_no_such_name() {
    let agent = TestAgent::spawn(sample_mib(), AgentBehavior::default()).await;
    let config = local_config(agent.port());

    // laLoadFloat is the last object in the agent's view
    let rows = get_table(
        &engine(),
        &config,
        &profile(CommunityVersion::V1),
        &[la_load_float()],
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn silent_agent_times_out_after_retries() {
    let behavior = AgentBehavior {
        silent: true,
        ..Default::default()
    };
    let agent = TestAgent::spawn(sample_mib(), behavior).await;
    let config = local_config(agent.port());

    let err = get_scalar(&engine(), &config, &profile(CommunityVersion::V2c), &[sys_name()])
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.to_string(), snmp_probe::error::TIMEOUT_INDICATION);
    assert_eq!(agent.request_count(), 2);

    let outcome = unknown_exit("SNMP", &err);
    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(
        outcome.message,
        "SNMP UNKNOWN - No SNMP response received before timeout"
    );
}

#[tokio::test]
async fn wrong_community_is_ignored_by_agent() {
    let agent = TestAgent::spawn(sample_mib(), AgentBehavior::default()).await;
    let config = local_config(agent.port()).with_community("private");
    let profile = SecurityProfile::build(&config, CommunityVersion::V2c).unwrap();

    let err = get_scalar(&engine(), &config, &profile, &[sys_name()])
        .await
        .unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn load_probe_end_to_end() {
    let agent = TestAgent::spawn(sample_mib(), AgentBehavior::default()).await;
    let config = local_config(agent.port());
    config.validate().unwrap();
    let registry = NameRegistry::new();

    let rows = get_table(
        &engine(),
        &config,
        &profile(CommunityVersion::V2c),
        &[la_load_float()],
    )
    .await
    .unwrap();
    let records = project_table(&registry, &rows, "laLoad");

    let loads: Vec<f32> = records
        .iter()
        .map(|record| record["laLoadFloat"].to_float().unwrap())
        .collect();
    assert_eq!(loads, [0.25, 0.5, 1.5]);

    let state = if loads.iter().any(|&load| load >= 1.0) {
        "WARNING"
    } else {
        "OK"
    };
    let outcome = report(state, format!("LOAD {} - load15={}", state, loads[2]));
    assert_eq!(outcome.verdict, Verdict::Warning);
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn raw_scalar_projection_over_udp() {
    let agent = TestAgent::spawn(sample_mib(), AgentBehavior::default()).await;
    let config = local_config(agent.port());
    let load5 = la_load_float().child(2);

    let bindings = get_scalar(&engine(), &config, &profile(CommunityVersion::V2c), &[load5])
        .await
        .unwrap();
    let record = project_scalar(&NameRegistry::new(), &bindings, "load", true);

    assert_eq!(record["oid"].as_text(), Some("1.3.6.1.4.1.2021.10.1.6.2"));
    assert_eq!(
        record["pretty_oid"].as_text(),
        Some("UCD-SNMP-MIB::laLoadFloat.2")
    );
    assert_eq!(record["load"].to_float().unwrap(), 0.5);
}
