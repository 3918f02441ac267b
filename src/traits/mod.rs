mod connection;
mod dialect;

pub use connection::{AsyncConnection, SyncConnection};
pub use dialect::Dialect;
