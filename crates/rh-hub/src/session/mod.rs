//! Operator sessions
//!
//! One [`SessionRunner`] per SSH shell: it reads edited lines and hands them
//! to the session's [`Commander`], which keeps the attached consoles.

mod commander;
mod console;
mod runner;

pub use commander::{Commander, Flow, IDLE_PROMPT, TEARDOWN_GRACE};
pub use runner::SessionRunner;
