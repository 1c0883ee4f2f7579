pub mod m202509220001_create_teachers;
pub mod m202509220002_create_attendance_sessions;
pub mod m202509220003_create_admin_logs;
