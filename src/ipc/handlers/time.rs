use crate::ipc::error::ok;
use crate::ipc::helpers::raw_str;
use crate::ipc::types::{AppState, Request};
use crate::timefmt;
use serde_json::json;

fn one(req: &Request, f: fn(&str) -> serde_json::Value) -> serde_json::Value {
    match raw_str(req, "time") {
        Ok(t) => ok(&req.id, f(&t)),
        Err(e) => e,
    }
}

fn two(req: &Request, f: fn(&str, &str) -> serde_json::Value) -> serde_json::Value {
    let start = match raw_str(req, "start") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let end = match raw_str(req, "end") {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, f(&start, &end))
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "time.formatDisplay" => one(req, |t| {
            json!({ "value": timefmt::format_time_for_display(t) })
        }),
        "time.formatSimple" => one(req, |t| json!({ "value": timefmt::format_time_simple(t) })),
        "time.validate" => one(req, |t| json!({ "valid": timefmt::validate_time_format(t) })),
        "time.formatDuration" => two(req, |s, e| {
            json!({ "value": timefmt::format_duration(s, e) })
        }),
        "time.isEndAfterStart" => two(req, |s, e| {
            json!({ "after": timefmt::is_end_time_after_start_time(s, e) })
        }),
        _ => return None,
    };
    Some(resp)
}
