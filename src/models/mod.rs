pub mod report;
pub mod timestamps;
pub mod user;

pub use report::{DailyReport, ReportStatus};
pub use timestamps::Timestamps;
pub use user::{Role, User};
