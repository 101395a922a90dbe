//! Scalar and table queries.
//!
//! Both operations go through an [`Engine`] handle owned by the probe's
//! entry point. Agent error statuses are classified here; everything the
//! engine could not complete arrives as [`Error::Transport`] already.

use crate::config::Configuration;
use crate::engine::{Engine, Response, Target};
use crate::error::{Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::pdu::PduType;
use crate::security::SecurityProfile;
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::CommunityVersion;

/// Upper bound on GETNEXT iterations in one table walk.
pub const MAX_TABLE_ROWS: usize = 65_536;

/// Fail with [`Error::Agent`] when the response carries an error status.
fn check_status(response: &Response) -> Result<()> {
    if response.error_status().is_error() {
        let oids: Vec<Oid> = response.varbinds.iter().map(|vb| vb.oid.clone()).collect();
        return Err(Error::agent(
            response.error_status,
            response.error_index,
            &oids,
        ));
    }
    Ok(())
}

/// Shape one GETNEXT reply into a row with one binding per column.
///
/// A column whose binding left its subtree, or carries an exception value,
/// is filled with `endOfMibView` at its previous OID and its cursor stays
/// put. Returns `None` once no column advanced.
fn next_row(columns: &[Oid], cursor: &mut [Oid], reply: &[VarBind]) -> Option<Vec<VarBind>> {
    let mut advanced = false;
    let row: Vec<VarBind> = columns
        .iter()
        .zip(cursor.iter_mut())
        .enumerate()
        .map(|(i, (column, previous))| match reply.get(i) {
            Some(vb) if !vb.value.is_exception() && vb.oid.starts_with(column) => {
                advanced = true;
                *previous = vb.oid.clone();
                vb.clone()
            }
            _ => VarBind::new(previous.clone(), Value::EndOfMibView),
        })
        .collect();
    advanced.then_some(row)
}

/// GET `oids` from the configured agent.
///
/// Returns the bindings in request order.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(snmp.target = %Target::from(config), snmp.oids = oids.len())
)]
pub async fn get_scalar<E: Engine>(
    engine: &E,
    config: &Configuration,
    profile: &SecurityProfile,
    oids: &[Oid],
) -> Result<Vec<VarBind>> {
    let target = Target::from(config);
    let response = engine
        .exchange(&target, profile, PduType::GetRequest, oids)
        .await?;
    check_status(&response)?;

    tracing::debug!(target: "snmp_probe::query", { snmp.varbinds = response.varbinds.len() }, "scalar query complete");
    Ok(response.varbinds)
}

/// Walk the columns starting at `oids` with GETNEXT, one row per iteration.
///
/// The agent's own iteration order is trusted: each request asks for the
/// successors of the previous row's OIDs without checking that they
/// increase. Every row holds exactly one binding per column; a column that
/// ran out early shows `endOfMibView` at its last OID. The walk stops at
/// the first reply with no column left to advance; that reply is not a row.
///
/// Any error aborts the walk; rows gathered so far are dropped.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(snmp.target = %Target::from(config), snmp.columns = oids.len())
)]
pub async fn get_table<E: Engine>(
    engine: &E,
    config: &Configuration,
    profile: &SecurityProfile,
    oids: &[Oid],
) -> Result<Vec<Vec<VarBind>>> {
    let target = Target::from(config);
    let v1 = matches!(
        profile,
        SecurityProfile::Community {
            version: CommunityVersion::V1,
            ..
        }
    );

    let mut rows: Vec<Vec<VarBind>> = Vec::new();
    let mut cursor = oids.to_vec();
    if cursor.is_empty() {
        return Ok(rows);
    }

    loop {
        let response = engine
            .exchange(&target, profile, PduType::GetNextRequest, &cursor)
            .await?;

        // SNMPv1 agents signal the end of the MIB view this way
        if v1 && response.error_status() == ErrorStatus::NoSuchName {
            tracing::trace!(target: "snmp_probe::query", "noSuchName ends v1 walk");
            break;
        }
        check_status(&response)?;

        let Some(row) = next_row(oids, &mut cursor, &response.varbinds) else {
            break;
        };
        if rows.len() >= MAX_TABLE_ROWS {
            tracing::warn!(target: "snmp_probe::query", { snmp.target = %target, rows = rows.len() }, "walk did not terminate");
            return Err(Error::transport(
                &target,
                format!("Table walk exceeded {} rows", MAX_TABLE_ROWS),
            ));
        }

        rows.push(row);
    }

    tracing::debug!(target: "snmp_probe::query", { snmp.rows = rows.len() }, "table walk complete");
    Ok(rows)
}
