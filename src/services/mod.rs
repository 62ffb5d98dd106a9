pub mod auth;
pub mod reports;
pub mod users;

pub use auth::AuthService;
pub use reports::{ReportAccess, ReportService};
pub use users::UserService;
