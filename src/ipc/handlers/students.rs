use crate::db::{self, StudentField};
use crate::ipc::error::{db_err, err, ok};
use crate::ipc::helpers::{db_conn, non_blank, optional_typed, required_str};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, AggregatedStudent, Group, Teacher};
use crate::timefmt;
use serde_json::json;

fn membership_extras(entry: &AggregatedStudent, teachers: &[Teacher]) -> serde_json::Value {
    let mut value = json!(entry);
    if let Some(groups) = value.get_mut("groups").and_then(|g| g.as_array_mut()) {
        for (slot, m) in groups.iter_mut().zip(&entry.groups) {
            slot["teacherName"] = json!(roster::lookup_teacher_name(teachers, &m.teacher_id));
            slot["schedule"] = json!(timefmt::format_duration(
                m.start_time.as_deref().unwrap_or(""),
                m.end_time.as_deref().unwrap_or(""),
            ));
        }
    }
    value
}

/// Aggregated, searched student list. Inline `groups`/`teachers` take the place
/// of the store so the call also works without a workspace.
fn handle_students_aggregate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let term = match req.params.get("term") {
        None => String::new(),
        Some(v) if v.is_null() => String::new(),
        Some(v) => match v.as_str() {
            Some(s) => s.to_string(),
            None => return err(&req.id, "bad_params", "term must be a string", None),
        },
    };
    let inline_groups: Option<Vec<Group>> = match optional_typed(req, "groups") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let inline_teachers: Option<Vec<Teacher>> = match optional_typed(req, "teachers") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let groups = match inline_groups {
        Some(g) => g,
        None => match db_conn(state, req) {
            Ok(conn) => match db::fetch_groups(conn) {
                Ok(g) => g,
                Err(e) => return db_err(&req.id, "db_query_failed", e, None),
            },
            Err(e) => return e,
        },
    };
    let teachers = match inline_teachers {
        Some(t) => t,
        None => match state.db.as_ref() {
            Some(conn) => match db::fetch_teachers(conn) {
                Ok(t) => t,
                Err(e) => return db_err(&req.id, "db_query_failed", e, None),
            },
            None => Vec::new(),
        },
    };

    let all = roster::aggregate(&groups);
    let students: Vec<serde_json::Value> = roster::filter(&all, &term)
        .into_iter()
        .map(|s| membership_extras(s, &teachers))
        .collect();

    ok(
        &req.id,
        json!({
            "total": all.len(),
            "matched": students.len(),
            "students": students
        }),
    )
}

fn parse_patch(
    req: &Request,
    patch: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<StudentField>, serde_json::Value> {
    let bad = |msg: String| err(&req.id, "bad_params", msg, None);
    let mut out = Vec::new();

    for key in ["name", "phone"] {
        let Some(v) = patch.get(key) else {
            continue;
        };
        let Some(s) = v.as_str() else {
            return Err(bad(format!("patch.{} must be a string", key)));
        };
        let Some(t) = non_blank(s) else {
            return Err(bad(format!("{} must not be empty", key)));
        };
        out.push(if key == "name" {
            StudentField::Name(t)
        } else {
            StudentField::Phone(t)
        });
    }

    let nullable: [(&str, fn(Option<String>) -> StudentField); 5] = [
        ("email", StudentField::Email),
        ("phone2", StudentField::Phone2),
        ("parentName", StudentField::ParentName),
        ("address", StudentField::Address),
        ("birthDate", StudentField::BirthDate),
    ];
    for (key, make) in nullable {
        let Some(v) = patch.get(key) else {
            continue;
        };
        if v.is_null() {
            out.push(make(None));
        } else if let Some(s) = v.as_str() {
            out.push(make(non_blank(s)));
        } else {
            return Err(bad(format!("patch.{} must be a string or null", key)));
        }
    }

    if let Some(v) = patch.get("courseFee") {
        if v.is_null() {
            out.push(StudentField::CourseFee(None));
        } else {
            match v.as_f64() {
                Some(f) if f.is_finite() && f >= 0.0 => out.push(StudentField::CourseFee(Some(f))),
                _ => {
                    return Err(bad(
                        "patch.courseFee must be a non-negative number or null".into(),
                    ))
                }
            }
        }
    }

    if out.is_empty() {
        return Err(bad("patch must include at least one field".into()));
    }
    Ok(out)
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing/invalid patch", None);
    };
    let fields = match parse_patch(req, patch) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match db::update_student(conn, &student_id, fields) {
        Ok(0) => err(&req.id, "not_found", "student not found", None),
        Ok(n) => ok(&req.id, json!({ "updated": n })),
        Err(e) => db_err(&req.id, "db_update_failed", e, Some("group_students")),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.aggregate" => Some(handle_students_aggregate(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        _ => None,
    }
}
