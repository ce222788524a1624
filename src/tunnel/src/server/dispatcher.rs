use crate::backend::{check_error, BackendConnector, BackendSession, QueryOutcome, RowValues};
use crate::protocol::frame::FrameWriter;
use crate::protocol::writers::{
    write_conn_info, write_connect_header, write_fields_header, write_result_set_header,
    write_row_data,
};
use crate::protocol::{BATCH_END, MORE_QUERIES};
use crate::server::request::{TunnelAction, TunnelRequest};

use std::borrow::Cow;
use tracing::{debug, warn};

const SHOW_VERSION_VARIABLES: &str = "SHOW VARIABLES LIKE '%version%'";

/// Runs one tunnel request through the connect / select-db / action state
/// machine and returns the framed response body.
///
/// The backend session is released on every path out of this function; the
/// connect-failure path never acquired one.
pub async fn handle_request<C: BackendConnector>(
    connector: &C,
    request: &TunnelRequest,
) -> Vec<u8> {
    let mut frame = FrameWriter::new();
    debug!(
        "TunnelSrv request action={:?} backend={} queries={}",
        request.action,
        request.backend_addr(),
        request.queries.len()
    );

    let mut session = match connector
        .connect(&request.host, &request.port, &request.user, &request.password)
        .await
    {
        Ok(session) => session,
        Err(err) => {
            warn!("TunnelSrv backend connect failed err = {err:?}");
            let (errno, errmsg) = check_error(&err);
            write_connect_header(&mut frame, errno);
            frame.put_block(&errmsg);
            return frame.into_bytes();
        }
    };

    if !request.database.is_empty() {
        if let Err(err) = session.select_db(&request.database).await {
            warn!("TunnelSrv select db failed err = {err:?}");
            let (errno, errmsg) = check_error(&err);
            write_connect_header(&mut frame, errno);
            frame.put_block(&errmsg);
            session.close().await;
            return frame.into_bytes();
        }
    }

    write_connect_header(&mut frame, 0);
    match request.action {
        TunnelAction::ConnectProbe => {
            run_probe(&mut frame, &mut session, &request.backend_addr()).await;
        }
        TunnelAction::QueryBatch => {
            run_queries(&mut frame, &mut session, &request.queries).await;
        }
        TunnelAction::Other => {}
    }
    session.close().await;
    frame.into_bytes()
}

/// Connect-probe branch: server and protocol versions come from the
/// variables the target reports, the address echoes the form fields. A
/// failing probe query leaves the body at the bare success header.
async fn run_probe<S: BackendSession>(frame: &mut FrameWriter, session: &mut S, addr: &str) {
    let outcome = match session.run_query(SHOW_VERSION_VARIABLES).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!("TunnelSrv version probe failed err = {err:?}");
            return;
        }
    };

    let mut server_version = String::new();
    let mut protocol_version: u32 = 0;
    if let (Some(name_idx), Some(value_idx)) = (
        field_index(&outcome, "Variable_name"),
        field_index(&outcome, "Value"),
    ) {
        for row in &outcome.rows {
            let name = text_at(row, name_idx);
            if name == "version" {
                server_version = text_at(row, value_idx).into_owned();
            } else if name == "protocol_version" {
                protocol_version = text_at(row, value_idx).parse().unwrap_or(0);
            }
        }
    }

    write_conn_info(
        frame,
        &format!("{addr} via TCP/IP"),
        &protocol_version.to_string(),
        &server_version,
    );
}

/// Query-batch branch. Result units keep the submission order. Empty
/// queries produce no bytes at all but still occupy their index, so the
/// separator arithmetic counts them; clients of the original tunnel expect
/// exactly that accounting.
async fn run_queries<S: BackendSession>(
    frame: &mut FrameWriter,
    session: &mut S,
    queries: &[String],
) {
    for (index, query) in queries.iter().enumerate() {
        if query.is_empty() {
            continue;
        }

        match session.run_query(query).await {
            Ok(outcome) => {
                let num_fields = outcome.fields.len();
                let num_rows = outcome.rows.len();
                // Navicat reads the row count of a plain SELECT out of the
                // affected-rows slot.
                let affected_rows = if outcome.affected_rows == 0 {
                    num_rows as u64
                } else {
                    outcome.affected_rows
                };
                write_result_set_header(
                    frame,
                    0,
                    affected_rows,
                    outcome.last_insert_id,
                    num_fields,
                    num_rows,
                );
                if num_fields > 0 {
                    write_fields_header(frame, &outcome.fields);
                    write_row_data(frame, &outcome.rows);
                } else {
                    frame.put_block(&[]);
                }
            }
            Err(err) => {
                warn!("TunnelSrv query {index} failed err = {err:?}");
                let (errno, errmsg) = check_error(&err);
                if errno > 0 {
                    write_result_set_header(frame, errno, 0, 0, 0, 0);
                    frame.put_block(&errmsg);
                } else {
                    // untyped driver failures keep the legacy shape of an
                    // empty success unit
                    write_result_set_header(frame, 0, 0, 0, 0, 0);
                    frame.put_block(&[]);
                }
            }
        }

        frame.put_u8(if index < queries.len() - 1 {
            MORE_QUERIES
        } else {
            BATCH_END
        });
    }
}

fn field_index(outcome: &QueryOutcome, name: &str) -> Option<usize> {
    outcome.fields.iter().position(|field| field.name == name)
}

fn text_at<'a>(row: &'a RowValues, index: usize) -> Cow<'a, str> {
    match row.get(index) {
        Some(Some(bytes)) => String::from_utf8_lossy(bytes),
        _ => Cow::Borrowed(""),
    }
}
