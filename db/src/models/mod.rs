pub mod admin_log;
pub mod attendance_session;
pub mod teacher;
