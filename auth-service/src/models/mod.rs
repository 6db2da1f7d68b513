pub mod project;
pub mod stage_grant;
pub mod user;

pub use project::{Project, Stage};
pub use stage_grant::StageGrant;
pub use user::{NewUser, SanitizedUser, User};
