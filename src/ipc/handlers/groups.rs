use crate::db;
use crate::ipc::error::{db_err, err, ok};
use crate::ipc::helpers::{db_conn, non_blank, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::roster::{Group, GroupStudent, Student};
use crate::timefmt;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

fn handle_groups_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "groups": [] }));
    };
    match db::fetch_groups(conn) {
        Ok(groups) => ok(&req.id, json!({ "groups": groups })),
        Err(e) => db_err(&req.id, "db_query_failed", e, None),
    }
}

fn check_schedule(
    req: &Request,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(), serde_json::Value> {
    for (key, value) in [("startTime", start), ("endTime", end)] {
        if let Some(t) = value {
            if !timefmt::validate_time_format(t) {
                return Err(err(
                    &req.id,
                    "bad_params",
                    format!("{} must be HH:MM (24-hour)", key),
                    Some(json!({ "value": t })),
                ));
            }
        }
    }
    if let (Some(s), Some(e)) = (start, end) {
        if !timefmt::is_end_time_after_start_time(s, e) {
            return Err(err(
                &req.id,
                "bad_params",
                "endTime must be after startTime",
                Some(json!({ "startTime": s, "endTime": e })),
            ));
        }
    }
    Ok(())
}

fn handle_groups_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut fields: [Option<String>; 6] = Default::default();
    for (slot, key) in fields.iter_mut().zip([
        "language",
        "level",
        "category",
        "teacherId",
        "startTime",
        "endTime",
    ]) {
        match optional_str(req, key) {
            Ok(v) => *slot = v,
            Err(e) => return e,
        }
    }
    let [language, level, category, teacher_id, start_time, end_time] = fields;

    if let Err(e) = check_schedule(req, start_time.as_deref(), end_time.as_deref()) {
        return e;
    }

    let group = Group {
        id: Uuid::new_v4().to_string(),
        name,
        language,
        level,
        category,
        teacher_id,
        start_time,
        end_time,
        students: Vec::new(),
    };
    if let Err(e) = db::insert_group(conn, &group) {
        return db_err(&req.id, "db_insert_failed", e, Some("class_groups"));
    }
    ok(&req.id, json!({ "groupId": group.id, "name": group.name }))
}

fn handle_groups_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let group_id = match required_str(req, "groupId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::delete_group(conn, &group_id) {
        Ok(true) => ok(&req.id, json!({ "ok": true })),
        Ok(false) => err(&req.id, "not_found", "group not found", None),
        Err(e) => db_err(&req.id, "db_delete_failed", e, Some("class_groups")),
    }
}

/// Student payload for enrolment. `id` is optional; a new one is minted when absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudentInput {
    #[serde(default)]
    id: Option<String>,
    name: String,
    phone: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone2: Option<String>,
    #[serde(default)]
    parent_name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    course_fee: Option<f64>,
}

impl StudentInput {
    fn into_student(self) -> Result<Student, String> {
        let name = self.name.trim().to_string();
        let phone = self.phone.trim().to_string();
        if name.is_empty() || phone.is_empty() {
            return Err("student.name/student.phone must not be empty".into());
        }
        if matches!(self.course_fee, Some(f) if !f.is_finite() || f < 0.0) {
            return Err("student.courseFee must be a non-negative number".into());
        }
        Ok(Student {
            id: self
                .id
                .as_deref()
                .and_then(non_blank)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name,
            email: self.email.as_deref().and_then(non_blank),
            phone,
            phone2: self.phone2.as_deref().and_then(non_blank),
            parent_name: self.parent_name.as_deref().and_then(non_blank),
            address: self.address.as_deref().and_then(non_blank),
            birth_date: self.birth_date.as_deref().and_then(non_blank),
            course_fee: self.course_fee,
        })
    }
}

fn handle_groups_add_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let group_id = match required_str(req, "groupId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(raw) = req.params.get("student").filter(|v| v.is_object()) else {
        return err(&req.id, "bad_params", "missing/invalid student", None);
    };
    let input: StudentInput = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("invalid student: {}", e),
                None,
            )
        }
    };
    let student = match input.into_student() {
        Ok(s) => s,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let status = match optional_str(req, "status") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match db::group_exists(conn, &group_id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "group not found", None),
        Err(e) => return db_err(&req.id, "db_query_failed", e, None),
    }

    match db::student_enrolled(conn, &group_id, &student.id) {
        Ok(false) => {}
        Ok(true) => {
            return err(
                &req.id,
                "conflict",
                "student already enrolled in group",
                Some(json!({ "groupId": group_id, "studentId": student.id })),
            )
        }
        Err(e) => return db_err(&req.id, "db_query_failed", e, None),
    }

    let gs = GroupStudent { student, status };
    if let Err(e) = db::insert_group_student(conn, &group_id, &gs) {
        return db_err(&req.id, "db_insert_failed", e, Some("group_students"));
    }
    ok(
        &req.id,
        json!({ "groupId": group_id, "studentId": gs.student.id }),
    )
}

fn handle_groups_set_student_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let group_id = match required_str(req, "groupId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let status = match required_str(req, "status") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::set_group_student_status(conn, &group_id, &student_id, &status) {
        Ok(0) => err(&req.id, "not_found", "student not enrolled in group", None),
        Ok(_) => ok(&req.id, json!({ "ok": true })),
        Err(e) => db_err(&req.id, "db_update_failed", e, Some("group_students")),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "groups.list" => Some(handle_groups_list(state, req)),
        "groups.create" => Some(handle_groups_create(state, req)),
        "groups.delete" => Some(handle_groups_delete(state, req)),
        "groups.addStudent" => Some(handle_groups_add_student(state, req)),
        "groups.setStudentStatus" => Some(handle_groups_set_student_status(state, req)),
        _ => None,
    }
}
