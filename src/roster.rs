use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_STATUS: &str = "active";
pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_TEACHER: &str = "Unknown Teacher";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_fee: Option<f64>,
}

/// A student record as embedded in one group, with that group's status tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStudent {
    #[serde(flatten)]
    pub student: Student,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub students: Vec<GroupStudent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembership {
    pub group_id: String,
    pub group_name: String,
    pub language: String,
    pub level: String,
    pub category: String,
    pub teacher_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub status: String,
}

impl GroupMembership {
    fn from_group(group: &Group, status: &str) -> Self {
        let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| UNKNOWN.to_string());
        GroupMembership {
            group_id: group.id.clone(),
            group_name: group.name.clone(),
            language: or_unknown(&group.language),
            level: or_unknown(&group.level),
            category: or_unknown(&group.category),
            teacher_id: or_unknown(&group.teacher_id),
            start_time: group.start_time.clone(),
            end_time: group.end_time.clone(),
            status: status.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStudent {
    #[serde(flatten)]
    pub student: Student,
    pub groups: Vec<GroupMembership>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Merge the students embedded in `groups` into one entry per (name, phone).
///
/// Output order is first encounter (group order, then student order within the
/// group). Non-membership fields come from the first record seen; later
/// records for the same pair only contribute memberships. A group already
/// listed on an entry is never added twice, and its status is not updated.
pub fn aggregate(groups: &[Group]) -> Vec<AggregatedStudent> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut out: Vec<AggregatedStudent> = Vec::new();

    for group in groups {
        for gs in &group.students {
            let key = (gs.student.name.clone(), gs.student.phone.clone());
            let status = gs.status.as_deref().unwrap_or(DEFAULT_STATUS);

            match index.get(&key) {
                Some(&pos) => {
                    let entry = &mut out[pos];
                    if !entry.groups.iter().any(|m| m.group_id == group.id) {
                        entry.groups.push(GroupMembership::from_group(group, status));
                    }
                }
                None => {
                    index.insert(key, out.len());
                    out.push(AggregatedStudent {
                        student: gs.student.clone(),
                        groups: vec![GroupMembership::from_group(group, status)],
                    });
                }
            }
        }
    }

    out
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field
        .map(|v| v.to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Search predicate. Name is a prefix match; email, phone and address are
/// substring matches. All comparisons ignore case.
pub fn matches(student: &Student, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    student.name.to_lowercase().starts_with(&needle)
        || contains_ci(student.email.as_deref(), &needle)
        || contains_ci(Some(student.phone.as_str()), &needle)
        || contains_ci(student.address.as_deref(), &needle)
}

pub fn filter<'a>(students: &'a [AggregatedStudent], term: &str) -> Vec<&'a AggregatedStudent> {
    students
        .iter()
        .filter(|s| matches(&s.student, term))
        .collect()
}

pub fn lookup_teacher_name(teachers: &[Teacher], teacher_id: &str) -> String {
    teachers
        .iter()
        .find(|t| t.id == teacher_id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| UNKNOWN_TEACHER.to_string())
}
