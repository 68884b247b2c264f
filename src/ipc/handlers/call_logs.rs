use crate::db::{self, CallLog};
use crate::ipc::error::{db_err, err, ok};
use crate::ipc::helpers::{db_conn, optional_str, raw_str, required_str};
use crate::ipc::types::{AppState, Request};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use uuid::Uuid;

fn utc_stamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn handle_call_logs_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_name = match required_str(req, "studentName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let phone = match required_str(req, "phone") {
        Ok(v) => v,
        Err(e) => return e,
    };
    // An empty note is a valid "called, nothing to add" entry.
    let note = match raw_str(req, "note") {
        Ok(v) => v.trim().to_string(),
        Err(e) => return e,
    };
    let outcome = match optional_str(req, "outcome") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let now = Utc::now();
    let called_at = match optional_str(req, "calledAt") {
        Ok(None) => utc_stamp(now),
        Ok(Some(raw)) => match DateTime::parse_from_rfc3339(&raw) {
            Ok(t) => utc_stamp(t.with_timezone(&Utc)),
            Err(e) => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("calledAt must be an RFC 3339 timestamp: {}", e),
                    Some(json!({ "value": raw })),
                )
            }
        },
        Err(e) => return e,
    };

    let log = CallLog {
        id: Uuid::new_v4().to_string(),
        student_id,
        student_name,
        phone,
        note,
        outcome,
        called_at,
        created_at: utc_stamp(now),
    };
    if let Err(e) = db::insert_call_log(conn, &log) {
        return db_err(&req.id, "db_insert_failed", e, Some("call_logs"));
    }
    tracing::info!(student_id = %log.student_id, call_log_id = %log.id, "call logged");
    ok(
        &req.id,
        json!({ "callLogId": log.id, "calledAt": log.called_at }),
    )
}

fn handle_call_logs_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "callLogs": [] }));
    };
    let student_id = match optional_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::list_call_logs(conn, student_id.as_deref()) {
        Ok(logs) => ok(&req.id, json!({ "callLogs": logs })),
        Err(e) => db_err(&req.id, "db_query_failed", e, None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "callLogs.add" => Some(handle_call_logs_add(state, req)),
        "callLogs.list" => Some(handle_call_logs_list(state, req)),
        _ => None,
    }
}
