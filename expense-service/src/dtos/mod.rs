pub mod auth;
pub mod members;
pub mod resources;
pub mod roles;

pub use auth::{
    AuthResponse, ChangePasswordRequest, CreateAdminRequest, LoginRequest, RegisterRequest,
    SetupStatusResponse, UpdateProfileRequest, UserProfile,
};
pub use members::{CreateMemberRequest, UpdateMemberRequest};
pub use roles::{CreateRoleRequest, PermissionCatalogResponse, UpdateRoleRequest};
