//! Authentication and authorization: the user/role store and the
//! credential/permission service built on top of it.

pub mod service;
pub mod store;

pub use service::{hash_password, AuthService, Identity, HASH_COST};
pub use store::{StoreError, UserRecord, UserStore, UserUpdate};
