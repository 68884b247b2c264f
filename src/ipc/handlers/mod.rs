pub mod call_logs;
pub mod core;
pub mod groups;
pub mod students;
pub mod teachers;
pub mod time;
