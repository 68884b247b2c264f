use crate::db;
use crate::ipc::error::{db_err, ok};
use crate::ipc::helpers::{db_conn, optional_str, optional_typed, required_str};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, Teacher};
use serde_json::json;
use uuid::Uuid;

fn handle_teachers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "teachers": [] }));
    };
    match db::fetch_teachers(conn) {
        Ok(teachers) => ok(&req.id, json!({ "teachers": teachers })),
        Err(e) => db_err(&req.id, "db_query_failed", e, None),
    }
}

fn handle_teachers_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let email = match optional_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let phone = match optional_str(req, "phone") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let teacher = Teacher {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        phone,
    };
    if let Err(e) = db::insert_teacher(conn, &teacher) {
        return db_err(&req.id, "db_insert_failed", e, Some("teachers"));
    }
    ok(&req.id, json!({ "teacherId": teacher.id, "name": teacher.name }))
}

/// Resolves against `params.teachers` when supplied, otherwise the store.
fn handle_teachers_lookup_name(state: &mut AppState, req: &Request) -> serde_json::Value {
    let teacher_id = match required_str(req, "teacherId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let inline: Option<Vec<Teacher>> = match optional_typed(req, "teachers") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let teachers = match inline {
        Some(t) => t,
        None => match state.db.as_ref() {
            Some(conn) => match db::fetch_teachers(conn) {
                Ok(t) => t,
                Err(e) => return db_err(&req.id, "db_query_failed", e, None),
            },
            None => Vec::new(),
        },
    };
    ok(
        &req.id,
        json!({ "name": roster::lookup_teacher_name(&teachers, &teacher_id) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.list" => Some(handle_teachers_list(state, req)),
        "teachers.create" => Some(handle_teachers_create(state, req)),
        "teachers.lookupName" => Some(handle_teachers_lookup_name(state, req)),
        _ => None,
    }
}
