pub mod auth;
pub mod authz;
pub mod credentials;
pub mod database;
pub mod directory;
pub mod error;
pub mod store;

pub use auth::{AuthService, AuthStrategy, CreateAccount};
pub use authz::AuthzService;
pub use database::Database;
pub use directory::{DirectoryAuthenticator, DirectoryError, DirectoryIdentity};
pub use error::ServiceError;
pub use store::UserStore;
