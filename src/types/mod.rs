mod connect_args;
mod driver;
mod secret;
mod url;

pub use connect_args::ConnectArgs;
pub use driver::{AsyncDriver, Driver, SyncDriver};
pub use secret::SecretString;
pub use url::DatabaseUrl;
pub(crate) use url::redact_userinfo;
