//! Dialect implementations
//! Real drivers are conditionally compiled based on features

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use self::in_memory_test::{
    ConnectMode, InMemoryTestConnection, InMemoryTestDialect, RecordedConnect,
};
#[cfg(feature = "mysql")]
pub use self::mysql::{BlockingMySqlConnection, MySqlConnection, MySqlDialect};
#[cfg(feature = "postgres")]
pub use self::postgres::{BlockingPostgresConnection, PostgresConnection, PostgresDialect};
#[cfg(feature = "sqlite")]
pub use self::sqlite::{SqliteAsyncConnection, SqliteConnection, SqliteDialect};
