//! Authentication for SSH operators
//!
//! Operators log in with a user name and password declared in the hub
//! configuration.

mod password;

pub use password::UserTable;
