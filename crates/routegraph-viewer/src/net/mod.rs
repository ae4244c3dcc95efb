pub mod client;
pub mod protocol;

pub use client::spawn_client;
pub use protocol::{Incoming, IncomingKind};
