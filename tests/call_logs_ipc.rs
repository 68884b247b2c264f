use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_schooldeskd");
    let mut child = Command::new(exe)
        .env_remove("SCHOOLDESK_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schooldeskd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn call_logs_are_listed_newest_first_per_student() {
    let workspace = temp_dir("schooldesk-call-logs");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let early = request(
        &mut stdin,
        &mut reader,
        "0",
        "callLogs.add",
        json!({ "studentId": "s1", "studentName": "Ann", "phone": "1", "note": "hi" }),
    );
    assert_eq!(error_code(&early), Some("no_workspace"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "callLogs.add",
        json!({
            "studentId": "s1",
            "studentName": "Ann Lee",
            "phone": "555-0101",
            "note": "  Asked about fees  ",
            "calledAt": "2026-03-02T10:15:00+02:00"
        }),
    );
    assert_eq!(first["calledAt"], json!("2026-03-02T08:15:00Z"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "callLogs.add",
        json!({
            "studentId": "s1",
            "studentName": "Ann Lee",
            "phone": "555-0101",
            "note": "",
            "outcome": "no answer",
            "calledAt": "2026-03-05T09:00:00Z"
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "callLogs.add",
        json!({
            "studentId": "s2",
            "studentName": "Bo Chan",
            "phone": "555-0202",
            "note": "Confirmed schedule",
            "calledAt": "2026-03-04T12:00:00Z"
        }),
    );

    let ann = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "callLogs.list",
        json!({ "studentId": "s1" }),
    );
    let logs = ann["callLogs"].as_array().expect("callLogs");
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["calledAt"], json!("2026-03-05T09:00:00Z"));
    assert_eq!(logs[0]["outcome"], json!("no answer"));
    assert_eq!(logs[0]["note"], json!(""));
    assert_eq!(logs[1]["note"], json!("Asked about fees"));
    assert!(logs[1]["outcome"].is_null());

    let all = request_ok(&mut stdin, &mut reader, "5", "callLogs.list", json!({}));
    let order: Vec<&str> = all["callLogs"]
        .as_array()
        .expect("callLogs")
        .iter()
        .filter_map(|l| l["studentName"].as_str())
        .collect();
    assert_eq!(order, vec!["Ann Lee", "Bo Chan", "Ann Lee"]);

    let bad_time = request(
        &mut stdin,
        &mut reader,
        "6",
        "callLogs.add",
        json!({
            "studentId": "s1",
            "studentName": "Ann Lee",
            "phone": "555-0101",
            "note": "x",
            "calledAt": "yesterday"
        }),
    );
    assert_eq!(error_code(&bad_time), Some("bad_params"));

    let no_phone = request(
        &mut stdin,
        &mut reader,
        "7",
        "callLogs.add",
        json!({ "studentId": "s1", "studentName": "Ann Lee", "note": "x" }),
    );
    assert_eq!(error_code(&no_phone), Some("bad_params"));

    let defaulted = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "callLogs.add",
        json!({ "studentId": "s3", "studentName": "Cy", "phone": "3", "note": "now" }),
    );
    assert!(defaulted["calledAt"].as_str().map(|s| s.ends_with('Z')).unwrap_or(false));
}
