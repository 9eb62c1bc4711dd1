pub mod attendance;
pub mod course;
pub mod login_log;
pub mod user;

pub use attendance::{
    AttendanceSession, GenerateQrRequest, QrPayload, ScanEntry, ScanRequest, SessionReport,
    StudentScanRecord,
};
pub use course::{Course, CourseRow, NewCourseRequest, Schedule, UpdateCourseRequest};
pub use login_log::LoginLog;
pub use user::{
    LoginRequest, LoginResponse, NewUserRequest, Role, UpdateUserRequest, User, UserWithHash,
};
