//! Remote console links

mod rcon;

pub use rcon::{RconConnector, RconLink, DIAL_TIMEOUT};
