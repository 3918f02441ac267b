use async_trait::async_trait;

use crate::error::{CredentialsError, Result};
use crate::traits::{AsyncConnection, SyncConnection};
use crate::types::{ConnectArgs, DatabaseUrl};

/// Trait for dialect connector implementations.
/// Dialects are responsible for:
/// - Turning a [`DatabaseUrl`] and [`ConnectArgs`] into native connect options
/// - Opening a single, unpooled connection in blocking or async mode
///
/// A dialect only has to implement the modes it supports; the defaults
/// report [`CredentialsError::DriverNotAvailable`].
#[async_trait]
pub trait Dialect: Send + Sync {
    /// Backend name this dialect is registered under, e.g. `postgresql`.
    fn name(&self) -> &'static str;

    fn supports_sync(&self) -> bool {
        false
    }

    fn supports_async(&self) -> bool {
        false
    }

    /// Open a connection, blocking the current thread until it is ready.
    fn connect_blocking(
        &self,
        url: &DatabaseUrl,
        connect_args: &ConnectArgs,
    ) -> Result<Box<dyn SyncConnection>> {
        let _ = (url, connect_args);
        Err(CredentialsError::DriverNotAvailable(format!(
            "dialect `{}` has no sync driver",
            self.name()
        )))
    }

    /// Open a connection on the ambient async runtime.
    async fn connect(
        &self,
        url: &DatabaseUrl,
        connect_args: &ConnectArgs,
    ) -> Result<Box<dyn AsyncConnection>> {
        let _ = (url, connect_args);
        Err(CredentialsError::DriverNotAvailable(format!(
            "dialect `{}` has no async driver",
            self.name()
        )))
    }
}
