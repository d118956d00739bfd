mod extractors;
mod password;

pub use extractors::Principal;
pub use password::{hash_password, verify_password};
