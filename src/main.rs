mod config;
mod db;
mod ipc;
mod roster;
mod timefmt;

use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_tracing(filter: &str) {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            init_tracing(config::DEFAULT_LOG_FILTER);
            tracing::error!("{e}");
            std::process::exit(2);
        }
    };
    init_tracing(&cfg.log_filter);

    let mut state = ipc::AppState::default();
    if let Some(path) = cfg.workspace.as_ref() {
        if let Err(e) = state.open_workspace(path) {
            tracing::warn!(workspace = %path.display(), "failed to open workspace: {e:#}");
        }
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut buf: Vec<u8> = Vec::new();

    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("stdin read failed, shutting down: {e}");
                break;
            }
        }

        let line = match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("request line is not valid UTF-8: {e}");
                reply_bad_json(&mut stdout, &format!("request line is not valid UTF-8: {e}"));
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(line.trim_end()) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::debug!("unparseable request line: {e}");
                reply_bad_json(&mut stdout, &e.to_string());
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}

fn reply_bad_json(stdout: &mut io::Stdout, message: &str) {
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::json!({
            "ok": false,
            "error": { "code": "bad_json", "message": message }
        })
    );
    let _ = stdout.flush();
}
