//! Collaborator trait definitions

mod link;
mod sink;

pub use link::{ConsoleLink, Connector};
pub use sink::OutputSink;
