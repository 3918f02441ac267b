use async_trait::async_trait;

use crate::error::Result;

/// A live connection opened by a [`SyncEngine`](crate::SyncEngine).
///
/// Dropping the value closes the connection; engines never pool them.
pub trait SyncConnection: Send {
    /// Name of the dialect that opened this connection.
    fn dialect_name(&self) -> &str;

    /// Ask the server for its version string.
    fn server_version(&mut self) -> Result<String>;
}

/// A live connection opened by an [`AsyncEngine`](crate::AsyncEngine).
#[async_trait]
pub trait AsyncConnection: Send + Sync {
    /// Name of the dialect that opened this connection.
    fn dialect_name(&self) -> &str;

    /// Ask the server for its version string.
    async fn server_version(&self) -> Result<String>;
}
