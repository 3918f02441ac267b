use std::fmt;

use serde::{Deserialize, Deserializer};

/// Known dialects with their corresponding async drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncDriver {
    PostgresqlAsyncpg,
    SqliteAiosqlite,
    MysqlAsyncmy,
    MysqlAiomysql,
}

impl AsyncDriver {
    pub const ALL: &'static [AsyncDriver] = &[
        AsyncDriver::PostgresqlAsyncpg,
        AsyncDriver::SqliteAiosqlite,
        AsyncDriver::MysqlAsyncmy,
        AsyncDriver::MysqlAiomysql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AsyncDriver::PostgresqlAsyncpg => "postgresql+asyncpg",
            AsyncDriver::SqliteAiosqlite => "sqlite+aiosqlite",
            AsyncDriver::MysqlAsyncmy => "mysql+asyncmy",
            AsyncDriver::MysqlAiomysql => "mysql+aiomysql",
        }
    }

    /// Looks up the table entry whose value is exactly `value`.
    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.as_str() == value)
    }
}

/// Known dialects with their corresponding sync drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncDriver {
    PostgresqlPsycopg2,
    PostgresqlPg8000,
    PostgresqlPsycopg2cffi,
    PostgresqlPypostgresql,
    PostgresqlPygresql,
    MysqlMysqldb,
    MysqlPymysql,
    MysqlMysqlconnector,
    MysqlCymysql,
    MysqlOursql,
    MysqlPyodbc,
    SqlitePysqlite,
    SqlitePysqlcipher,
    OracleCxOracle,
    MssqlPyodbc,
    MssqlMxodbc,
    MssqlPymssql,
}

impl SyncDriver {
    pub const ALL: &'static [SyncDriver] = &[
        SyncDriver::PostgresqlPsycopg2,
        SyncDriver::PostgresqlPg8000,
        SyncDriver::PostgresqlPsycopg2cffi,
        SyncDriver::PostgresqlPypostgresql,
        SyncDriver::PostgresqlPygresql,
        SyncDriver::MysqlMysqldb,
        SyncDriver::MysqlPymysql,
        SyncDriver::MysqlMysqlconnector,
        SyncDriver::MysqlCymysql,
        SyncDriver::MysqlOursql,
        SyncDriver::MysqlPyodbc,
        SyncDriver::SqlitePysqlite,
        SyncDriver::SqlitePysqlcipher,
        SyncDriver::OracleCxOracle,
        SyncDriver::MssqlPyodbc,
        SyncDriver::MssqlMxodbc,
        SyncDriver::MssqlPymssql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDriver::PostgresqlPsycopg2 => "postgresql+psycopg2",
            SyncDriver::PostgresqlPg8000 => "postgresql+pg8000",
            SyncDriver::PostgresqlPsycopg2cffi => "postgresql+psycopg2cffi",
            SyncDriver::PostgresqlPypostgresql => "postgresql+pypostgresql",
            SyncDriver::PostgresqlPygresql => "postgresql+pygresql",
            SyncDriver::MysqlMysqldb => "mysql+mysqldb",
            SyncDriver::MysqlPymysql => "mysql+pymysql",
            SyncDriver::MysqlMysqlconnector => "mysql+mysqlconnector",
            SyncDriver::MysqlCymysql => "mysql+cymysql",
            SyncDriver::MysqlOursql => "mysql+oursql",
            SyncDriver::MysqlPyodbc => "mysql+pyodbc",
            SyncDriver::SqlitePysqlite => "sqlite+pysqlite",
            SyncDriver::SqlitePysqlcipher => "sqlite+pysqlcipher",
            SyncDriver::OracleCxOracle => "oracle+cx_oracle",
            SyncDriver::MssqlPyodbc => "mssql+pyodbc",
            SyncDriver::MssqlMxodbc => "mssql+mxodbc",
            SyncDriver::MssqlPymssql => "mssql+pymssql",
        }
    }

    /// Looks up the table entry whose value is exactly `value`.
    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.as_str() == value)
    }
}

/// A `dialect+driver` name: a known async driver, a known sync driver, or
/// any other string passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Driver {
    Async(AsyncDriver),
    Sync(SyncDriver),
    Other(String),
}

impl Driver {
    /// Maps `value` onto a known driver when it matches a table entry,
    /// otherwise keeps it as [`Driver::Other`].
    pub fn parse(value: &str) -> Self {
        if let Some(driver) = AsyncDriver::from_value(value) {
            Driver::Async(driver)
        } else if let Some(driver) = SyncDriver::from_value(value) {
            Driver::Sync(driver)
        } else {
            Driver::Other(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Driver::Async(driver) => driver.as_str(),
            Driver::Sync(driver) => driver.as_str(),
            Driver::Other(name) => name,
        }
    }

    /// Whether an engine for this driver must be built with the async factory.
    ///
    /// Strings outside both tables are treated as sync.
    pub fn is_async(&self) -> bool {
        match self {
            Driver::Async(_) => true,
            Driver::Sync(_) => false,
            Driver::Other(name) => AsyncDriver::from_value(name).is_some(),
        }
    }

    /// The part before the first `+`, e.g. `postgresql`.
    pub fn dialect(&self) -> &str {
        let name = self.as_str();
        name.split_once('+').map_or(name, |(dialect, _)| dialect)
    }

    /// The part after the first `+`, if any, e.g. `asyncpg`.
    pub fn driver_name(&self) -> Option<&str> {
        self.as_str().split_once('+').map(|(_, driver)| driver)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AsyncDriver> for Driver {
    fn from(driver: AsyncDriver) -> Self {
        Driver::Async(driver)
    }
}

impl From<SyncDriver> for Driver {
    fn from(driver: SyncDriver) -> Self {
        Driver::Sync(driver)
    }
}

impl From<String> for Driver {
    fn from(name: String) -> Self {
        Driver::Other(name)
    }
}

impl From<&str> for Driver {
    fn from(name: &str) -> Self {
        Driver::Other(name.to_string())
    }
}

impl<'de> Deserialize<'de> for Driver {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Driver::parse(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_drivers_classify() {
        assert!(Driver::from(AsyncDriver::PostgresqlAsyncpg).is_async());
        assert!(!Driver::from(SyncDriver::PostgresqlPsycopg2).is_async());
    }

    #[test]
    fn test_plain_strings_classify_by_value() {
        assert!(Driver::from("postgresql+asyncpg").is_async());
        assert!(Driver::from("sqlite+aiosqlite").is_async());
        assert!(!Driver::from("postgresql+psycopg2").is_async());
        assert!(!Driver::from("snowflake").is_async());
        assert!(!Driver::from("").is_async());
    }

    #[test]
    fn test_table_is_bidirectional() {
        for driver in AsyncDriver::ALL {
            assert_eq!(AsyncDriver::from_value(driver.as_str()), Some(*driver));
            assert_eq!(SyncDriver::from_value(driver.as_str()), None);
        }
        for driver in SyncDriver::ALL {
            assert_eq!(SyncDriver::from_value(driver.as_str()), Some(*driver));
            assert_eq!(AsyncDriver::from_value(driver.as_str()), None);
        }
        assert_eq!(AsyncDriver::ALL.len(), 4);
        assert_eq!(SyncDriver::ALL.len(), 17);
    }

    #[test]
    fn test_parse_prefers_known_variants() {
        assert_eq!(
            Driver::parse("mysql+pymysql"),
            Driver::Sync(SyncDriver::MysqlPymysql)
        );
        assert_eq!(
            Driver::parse("mysql+asyncmy"),
            Driver::Async(AsyncDriver::MysqlAsyncmy)
        );
        assert_eq!(
            Driver::parse("duckdb"),
            Driver::Other("duckdb".to_string())
        );
    }

    #[test]
    fn test_dialect_and_driver_name() {
        let driver = Driver::from(SyncDriver::OracleCxOracle);
        assert_eq!(driver.dialect(), "oracle");
        assert_eq!(driver.driver_name(), Some("cx_oracle"));

        let driver = Driver::from("snowflake");
        assert_eq!(driver.dialect(), "snowflake");
        assert_eq!(driver.driver_name(), None);
    }
}
