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
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("schooldesk-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));

    // Store-backed methods before a workspace is selected.
    let res = request(&mut stdin, &mut reader, "2", "groups.create", json!({ "name": "A1" }));
    assert_eq!(error_code(&res), Some("no_workspace"));
    let listed = request_ok(&mut stdin, &mut reader, "3", "groups.list", json!({}));
    assert_eq!(listed["groups"], json!([]));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(workspace.join("schooldesk.sqlite3").is_file());

    let calls: Vec<(&str, serde_json::Value)> = vec![
        ("teachers.list", json!({})),
        ("teachers.create", json!({ "name": "Ms. Grey" })),
        ("teachers.lookupName", json!({ "teacherId": "nobody" })),
        ("groups.list", json!({})),
        ("groups.create", json!({ "name": "Evening B2" })),
        ("groups.delete", json!({ "groupId": "missing" })),
        (
            "groups.addStudent",
            json!({ "groupId": "missing", "student": { "name": "A", "phone": "1" } }),
        ),
        ("groups.setStudentStatus", json!({ "groupId": "g", "studentId": "s", "status": "left" })),
        ("students.aggregate", json!({})),
        ("students.update", json!({ "studentId": "s", "patch": { "name": "B" } })),
        ("callLogs.add", json!({ "studentId": "s", "studentName": "A", "phone": "1", "note": "" })),
        ("callLogs.list", json!({})),
        ("time.formatDisplay", json!({ "time": "13:30" })),
        ("time.formatSimple", json!({ "time": "9:5" })),
        ("time.formatDuration", json!({ "start": "09:00", "end": "10:30" })),
        ("time.validate", json!({ "time": "23:59" })),
        ("time.isEndAfterStart", json!({ "start": "09:00", "end": "10:00" })),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = format!("smoke-{}", i);
        let res = request(&mut stdin, &mut reader, &id, method, params);
        assert_ne!(
            error_code(&res),
            Some("not_implemented"),
            "unexpected unknown method for {}",
            method
        );
    }

    let unknown = request(&mut stdin, &mut reader, "x", "grades.list", json!({}));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    let missing = request(&mut stdin, &mut reader, "y", "workspace.select", json!({}));
    assert_eq!(error_code(&missing), Some("bad_params"));

    // Garbage lines get an error reply without an id and do not end the session.
    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush garbage");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json reply");
    let bad: serde_json::Value = serde_json::from_str(line.trim()).expect("parse bad_json reply");
    assert_eq!(bad["ok"], json!(false));
    assert_eq!(error_code(&bad), Some("bad_json"));

    let health = request_ok(&mut stdin, &mut reader, "z", "health", json!({}));
    assert!(health["workspacePath"].is_string());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn invalid_utf8_line_gets_bad_json_and_session_continues() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let mut raw: Vec<u8> = br#"{"id":"x","method":"health","params":{"n":""#.to_vec();
    raw.push(0xff);
    raw.extend_from_slice(b"\"}}\n");
    stdin.write_all(&raw).expect("write invalid utf-8 line");
    stdin.flush().expect("flush invalid utf-8 line");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json reply");
    let bad: serde_json::Value = serde_json::from_str(line.trim()).expect("parse bad_json reply");
    assert_eq!(bad["ok"], json!(false));
    assert_eq!(error_code(&bad), Some("bad_json"));

    let health = request_ok(&mut stdin, &mut reader, "after", "health", json!({}));
    assert!(health.get("version").is_some());

    drop(stdin);
    let status = child.wait().expect("wait for sidecar");
    assert!(status.success());
}
