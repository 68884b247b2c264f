use crate::roster::{Group, GroupStudent, Student, Teacher};
use anyhow::Context;
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

pub const DB_FILE: &str = "schooldesk.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_groups(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            language TEXT,
            level TEXT,
            category TEXT,
            teacher_id TEXT,
            start_time TEXT,
            end_time TEXT,
            sort_order INTEGER NOT NULL,
            created_at TEXT
        )",
        [],
    )?;

    // Student records are embedded per group; the same person may appear in
    // several groups under different ids.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS group_students(
            row_id TEXT PRIMARY KEY,
            group_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT NOT NULL,
            phone2 TEXT,
            parent_name TEXT,
            address TEXT,
            birth_date TEXT,
            course_fee REAL,
            status TEXT,
            sort_order INTEGER NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(group_id) REFERENCES class_groups(id),
            UNIQUE(group_id, student_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_group_students_group
         ON group_students(group_id, sort_order)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_group_students_student ON group_students(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS call_logs(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            phone TEXT NOT NULL,
            note TEXT NOT NULL,
            outcome TEXT,
            called_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_call_logs_student ON call_logs(student_id, called_at)",
        [],
    )?;

    Ok(conn)
}

pub fn fetch_teachers(conn: &Connection) -> anyhow::Result<Vec<Teacher>> {
    let mut stmt = conn.prepare("SELECT id, name, email, phone FROM teachers ORDER BY name, id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Teacher {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_teacher(conn: &Connection, teacher: &Teacher) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO teachers(id, name, email, phone) VALUES(?, ?, ?, ?)",
        (
            &teacher.id,
            &teacher.name,
            teacher.email.as_deref(),
            teacher.phone.as_deref(),
        ),
    )?;
    Ok(())
}

/// All groups in creation order, each with its embedded students in enrolment order.
pub fn fetch_groups(conn: &Connection) -> anyhow::Result<Vec<Group>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, language, level, category, teacher_id, start_time, end_time
         FROM class_groups
         ORDER BY sort_order",
    )?;
    let mut groups = stmt
        .query_map([], |row| {
            Ok(Group {
                id: row.get(0)?,
                name: row.get(1)?,
                language: row.get(2)?,
                level: row.get(3)?,
                category: row.get(4)?,
                teacher_id: row.get(5)?,
                start_time: row.get(6)?,
                end_time: row.get(7)?,
                students: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let by_id: HashMap<String, usize> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g.id.clone(), i))
        .collect();

    let mut stmt = conn.prepare(
        "SELECT gs.group_id, gs.student_id, gs.name, gs.email, gs.phone, gs.phone2,
                gs.parent_name, gs.address, gs.birth_date, gs.course_fee, gs.status
         FROM group_students gs
         JOIN class_groups g ON g.id = gs.group_id
         ORDER BY g.sort_order, gs.sort_order",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let group_id: String = row.get(0)?;
            Ok((
                group_id,
                GroupStudent {
                    student: Student {
                        id: row.get(1)?,
                        name: row.get(2)?,
                        email: row.get(3)?,
                        phone: row.get(4)?,
                        phone2: row.get(5)?,
                        parent_name: row.get(6)?,
                        address: row.get(7)?,
                        birth_date: row.get(8)?,
                        course_fee: row.get(9)?,
                    },
                    status: row.get(10)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (group_id, gs) in rows {
        if let Some(&i) = by_id.get(&group_id) {
            groups[i].students.push(gs);
        }
    }
    Ok(groups)
}

pub fn group_exists(conn: &Connection, group_id: &str) -> anyhow::Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM class_groups WHERE id = ?", [group_id], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

pub fn student_enrolled(
    conn: &Connection,
    group_id: &str,
    student_id: &str,
) -> anyhow::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM group_students WHERE group_id = ? AND student_id = ?",
            [group_id, student_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Inserts the group header only; `group.students` is ignored.
pub fn insert_group(conn: &Connection, group: &Group) -> anyhow::Result<()> {
    let sort_order: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM class_groups",
        [],
        |r| r.get(0),
    )?;
    conn.execute(
        "INSERT INTO class_groups(
           id, name, language, level, category, teacher_id, start_time, end_time,
           sort_order, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
        (
            &group.id,
            &group.name,
            group.language.as_deref(),
            group.level.as_deref(),
            group.category.as_deref(),
            group.teacher_id.as_deref(),
            group.start_time.as_deref(),
            group.end_time.as_deref(),
            sort_order,
        ),
    )?;
    Ok(())
}

/// Returns false when the group did not exist.
pub fn delete_group(conn: &Connection, group_id: &str) -> anyhow::Result<bool> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM group_students WHERE group_id = ?", [group_id])?;
    let changed = tx.execute("DELETE FROM class_groups WHERE id = ?", [group_id])?;
    tx.commit()?;
    Ok(changed > 0)
}

pub fn insert_group_student(
    conn: &Connection,
    group_id: &str,
    gs: &GroupStudent,
) -> anyhow::Result<()> {
    let sort_order: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM group_students WHERE group_id = ?",
        [group_id],
        |r| r.get(0),
    )?;
    let s = &gs.student;
    conn.execute(
        "INSERT INTO group_students(
           row_id, group_id, student_id, name, email, phone, phone2, parent_name,
           address, birth_date, course_fee, status, sort_order, updated_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
        rusqlite::params![
            uuid::Uuid::new_v4().to_string(),
            group_id,
            s.id,
            s.name,
            s.email,
            s.phone,
            s.phone2,
            s.parent_name,
            s.address,
            s.birth_date,
            s.course_fee,
            gs.status,
            sort_order,
        ],
    )?;
    Ok(())
}

/// Returns the number of embedded records changed (0 or 1).
pub fn set_group_student_status(
    conn: &Connection,
    group_id: &str,
    student_id: &str,
    status: &str,
) -> anyhow::Result<usize> {
    let changed = conn.execute(
        "UPDATE group_students
         SET status = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
         WHERE group_id = ? AND student_id = ?",
        (status, group_id, student_id),
    )?;
    Ok(changed)
}

/// One column assignment of a student patch. `None` clears the column.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentField {
    Name(String),
    Phone(String),
    Email(Option<String>),
    Phone2(Option<String>),
    ParentName(Option<String>),
    Address(Option<String>),
    BirthDate(Option<String>),
    CourseFee(Option<f64>),
}

impl StudentField {
    fn column(&self) -> &'static str {
        match self {
            StudentField::Name(_) => "name",
            StudentField::Phone(_) => "phone",
            StudentField::Email(_) => "email",
            StudentField::Phone2(_) => "phone2",
            StudentField::ParentName(_) => "parent_name",
            StudentField::Address(_) => "address",
            StudentField::BirthDate(_) => "birth_date",
            StudentField::CourseFee(_) => "course_fee",
        }
    }

    fn into_value(self) -> Value {
        let text = |v: Option<String>| v.map(Value::Text).unwrap_or(Value::Null);
        match self {
            StudentField::Name(s) | StudentField::Phone(s) => Value::Text(s),
            StudentField::Email(v)
            | StudentField::Phone2(v)
            | StudentField::ParentName(v)
            | StudentField::Address(v)
            | StudentField::BirthDate(v) => text(v),
            StudentField::CourseFee(v) => v.map(Value::Real).unwrap_or(Value::Null),
        }
    }
}

/// Applies the patch to every embedded record carrying `student_id`.
/// Returns the number of records changed.
pub fn update_student(
    conn: &Connection,
    student_id: &str,
    patch: Vec<StudentField>,
) -> anyhow::Result<usize> {
    if patch.is_empty() {
        return Ok(0);
    }
    let mut set_parts: Vec<String> = Vec::new();
    let mut bind_values: Vec<Value> = Vec::new();
    for field in patch {
        set_parts.push(format!("{} = ?", field.column()));
        bind_values.push(field.into_value());
    }
    set_parts.push("updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')".into());

    let sql = format!(
        "UPDATE group_students SET {} WHERE student_id = ?",
        set_parts.join(", ")
    );
    bind_values.push(Value::Text(student_id.to_string()));
    let changed = conn.execute(&sql, params_from_iter(bind_values))?;
    Ok(changed)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLog {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub phone: String,
    pub note: String,
    pub outcome: Option<String>,
    pub called_at: String,
    pub created_at: String,
}

pub fn insert_call_log(conn: &Connection, log: &CallLog) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO call_logs(
           id, student_id, student_name, phone, note, outcome, called_at, created_at
         )
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &log.id,
            &log.student_id,
            &log.student_name,
            &log.phone,
            &log.note,
            log.outcome.as_deref(),
            &log.called_at,
            &log.created_at,
        ),
    )?;
    Ok(())
}

/// Newest call first. `student_id` narrows to one student.
pub fn list_call_logs(conn: &Connection, student_id: Option<&str>) -> anyhow::Result<Vec<CallLog>> {
    let mut sql = String::from(
        "SELECT id, student_id, student_name, phone, note, outcome, called_at, created_at
         FROM call_logs",
    );
    let mut bind_values: Vec<Value> = Vec::new();
    if let Some(sid) = student_id {
        sql.push_str(" WHERE student_id = ?");
        bind_values.push(Value::Text(sid.to_string()));
    }
    sql.push_str(" ORDER BY called_at DESC, created_at DESC, id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(bind_values), |row| {
            Ok(CallLog {
                id: row.get(0)?,
                student_id: row.get(1)?,
                student_name: row.get(2)?,
                phone: row.get(3)?,
                note: row.get(4)?,
                outcome: row.get(5)?,
                called_at: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
