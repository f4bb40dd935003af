pub mod audit;
pub mod auth;
pub mod credentials;
pub mod database;
pub mod error;
pub mod guard;
pub mod jwt;
pub mod members;
pub mod metrics;
pub mod roles;
pub mod store;

pub use audit::AuditTrail;
pub use auth::AuthService;
pub use credentials::CredentialStore;
pub use database::{Database, MongoDb};
pub use error::{with_store_timeout, ServiceError};
pub use guard::{can_act, require, require_any, require_can_act, AuthContext, Owned};
pub use jwt::{JwtService, MemberClaim, SessionClaims};
pub use members::MemberService;
pub use roles::RoleRegistry;
pub use store::{DocumentStore, MemoryCollection, MongoCollection, StoreError};
