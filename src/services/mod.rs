//! Business logic services.

pub mod avatar;
pub mod google;
pub mod storage;
pub mod tokens;
pub mod totp;

pub use avatar::AvatarService;
pub use google::GoogleVerifier;
pub use storage::ObjectStorage;
pub use tokens::TokenIssuer;
