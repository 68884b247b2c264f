use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;

pub fn db_conn<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Required string param, trimmed, must not be empty.
pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    let Some(v) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    let Some(s) = v.as_str() else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a string", key),
            None,
        ));
    };
    let t = s.trim();
    if t.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", key),
            None,
        ));
    }
    Ok(t.to_string())
}

/// Required string param taken verbatim. Empty strings are allowed.
pub fn raw_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Optional string param. Absent, null and blank all read as None.
pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => match v.as_str() {
            Some(s) => Ok(non_blank(s)),
            None => Err(err(
                &req.id,
                "bad_params",
                format!("{} must be a string or null", key),
                None,
            )),
        },
    }
}

pub fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Deserialize `params[key]` into `T` when present.
pub fn optional_typed<T: serde::de::DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Option<T>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
            err(
                &req.id,
                "bad_params",
                format!("invalid {}: {}", key, e),
                None,
            )
        }),
    }
}
