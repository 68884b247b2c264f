use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let message = message.into();
    tracing::debug!(request_id = id, code, "{}", message);
    let mut error = json!({
        "code": code,
        "message": message,
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Store failures are logged at warn since they point at the workspace, not the caller.
pub fn db_err(id: &str, code: &str, e: anyhow::Error, table: Option<&str>) -> serde_json::Value {
    tracing::warn!(request_id = id, code, "store error: {e:#}");
    err(
        id,
        code,
        format!("{e:#}"),
        table.map(|t| json!({ "table": t })),
    )
}
