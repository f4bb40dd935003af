pub mod password;
pub mod validation;

pub use password::{
    hash_password, validate_password, verify_password, Password, PasswordHashString, PolicyError,
};
pub use validation::{clean_name, normalize_email, ValidatedJson};
