pub mod attendance;
pub mod calendar;
pub mod coordinator;
pub mod geofence;
pub mod schedule;

pub use attendance::{AttendanceError, AttendanceManager, AttendanceSettings};
pub use calendar::CalendarGate;
pub use coordinator::InstanceCoordinator;
pub use geofence::{Geofence, GeofenceCheck, GeofenceError};
pub use schedule::WorkSchedule;
