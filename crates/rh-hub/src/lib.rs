//! rh-hub: SSH gateway for game server remote consoles
//!
//! Operators log in over SSH and get a small line-oriented shell. From it
//! they attach to one or more RCON consoles, type commands into the one in
//! the foreground and watch output from every attached console, prefixed
//! with its name, in the same terminal.

pub mod auth;
pub mod link;
pub mod server;
pub mod session;
pub mod shell;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use session::Commander;
pub use state::HubState;
