use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::engine::{Engine, EngineFactory, PoolPolicy};
use crate::error::{CredentialsError, Result};
use crate::types::{redact_userinfo, ConnectArgs, DatabaseUrl, Driver, SecretString};

const URL_PARAMS: [&str; 7] = [
    "driver", "username", "password", "database", "host", "port", "query",
];
const REQUIRED_URL_PARAMS: [&str; 2] = ["driver", "database"];

/// A pre-built connection URL, either as text or already structured.
#[derive(Clone, PartialEq)]
pub enum UrlSource {
    Raw(String),
    Structured(DatabaseUrl),
}

impl UrlSource {
    fn is_empty(&self) -> bool {
        matches!(self, UrlSource::Raw(raw) if raw.is_empty())
    }

    fn to_database_url(&self) -> Result<DatabaseUrl> {
        match self {
            UrlSource::Raw(raw) => DatabaseUrl::parse(raw),
            UrlSource::Structured(url) => Ok(url.clone()),
        }
    }
}

impl fmt::Debug for UrlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlSource::Raw(raw) => {
                let shown = match DatabaseUrl::parse(raw) {
                    Ok(url) => url.to_string(),
                    Err(_) => redact_userinfo(raw),
                };
                f.debug_tuple("Raw").field(&shown).finish()
            }
            UrlSource::Structured(url) => f.debug_tuple("Structured").field(url).finish(),
        }
    }
}

impl From<&str> for UrlSource {
    fn from(raw: &str) -> Self {
        UrlSource::Raw(raw.to_string())
    }
}

impl From<String> for UrlSource {
    fn from(raw: String) -> Self {
        UrlSource::Raw(raw)
    }
}

impl From<DatabaseUrl> for UrlSource {
    fn from(url: DatabaseUrl) -> Self {
        UrlSource::Structured(url)
    }
}

impl<'de> Deserialize<'de> for UrlSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(UrlSource::Raw)
    }
}

/// Raw descriptor fields, validated by [`CredentialsBuilder::build`].
///
/// Either give `url`, or give discrete params with at least `driver` and
/// `database`; never both.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsBuilder {
    driver: Option<Driver>,
    username: Option<String>,
    password: Option<SecretString>,
    database: Option<String>,
    host: Option<String>,
    #[serde(default, deserialize_with = "port_from_text_or_number")]
    port: Option<String>,
    query: Option<BTreeMap<String, String>>,
    url: Option<UrlSource>,
    connect_args: Option<ConnectArgs>,
}

impl CredentialsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The driver name, e.g. `postgresql+asyncpg`.
    pub fn driver(mut self, driver: impl Into<Driver>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<SecretString>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: impl ToString) -> Self {
        self.port = Some(port.to_string());
        self
    }

    /// Options passed to the dialect upon connect.
    pub fn query<K: Into<String>, V: Into<String>>(
        mut self,
        query: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.query = Some(
            query
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// A complete URL; mutually exclusive with the discrete params.
    pub fn url(mut self, url: impl Into<UrlSource>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Extra arguments forwarded verbatim to the dialect's connect call.
    pub fn connect_args(mut self, connect_args: ConnectArgs) -> Self {
        self.connect_args = Some(connect_args);
        self
    }

    /// Validate the fields, render the URL and classify the driver.
    pub fn build(self) -> Result<DatabaseCredentials> {
        let async_supported = self.driver.as_ref().is_some_and(Driver::is_async);

        let rendered_url = match self.url.as_ref().filter(|url| !url.is_empty()) {
            None => self.render_from_params()?,
            Some(url) => {
                if !self.populated_params().is_empty() {
                    return Err(CredentialsError::UrlConflict {
                        params: URL_PARAMS.to_vec(),
                    });
                }
                url.to_database_url()?
            }
        };

        debug!(url = %rendered_url, async_supported, "Initialized database credentials");
        Ok(DatabaseCredentials {
            fields: self,
            rendered_url,
            async_supported,
        })
    }

    fn populated_params(&self) -> Vec<&'static str> {
        let populated = [
            self.driver.as_ref().is_some_and(|d| !d.is_empty()),
            non_empty(&self.username).is_some(),
            self.password.as_ref().is_some_and(|p| !p.is_empty()),
            non_empty(&self.database).is_some(),
            non_empty(&self.host).is_some(),
            non_empty(&self.port).is_some(),
            self.query.as_ref().is_some_and(|q| !q.is_empty()),
        ];
        URL_PARAMS
            .iter()
            .zip(populated)
            .filter_map(|(name, set)| set.then_some(*name))
            .collect()
    }

    fn render_from_params(&self) -> Result<DatabaseUrl> {
        let driver = self.driver.as_ref().filter(|d| !d.is_empty());
        let (Some(driver), Some(database)) = (driver, non_empty(&self.database)) else {
            return Err(CredentialsError::MissingUrlParams {
                required: REQUIRED_URL_PARAMS.to_vec(),
            });
        };

        let mut url = DatabaseUrl::create(driver.as_str()).with_database(database);
        if let Some(username) = non_empty(&self.username) {
            url = url.with_username(username);
        }
        if let Some(password) = self.password.as_ref().filter(|p| !p.is_empty()) {
            url = url.with_password(password.clone());
        }
        if let Some(host) = non_empty(&self.host) {
            url = url.with_host(host);
        }
        if let Some(port) = non_empty(&self.port) {
            let port = port
                .parse()
                .map_err(|_| CredentialsError::InvalidPort(port.to_string()))?;
            url = url.with_port(port);
        }
        if let Some(query) = &self.query {
            url = url.with_query(query.clone());
        }
        Ok(url)
    }
}

/// Stored connection parameters for one database.
///
/// The connection URL and the sync/async classification are computed once,
/// when the credentials are built, and never change afterwards.
///
/// # Example
/// ```
/// use dbcreds::{AsyncDriver, DatabaseCredentials};
///
/// let credentials = DatabaseCredentials::builder()
///     .driver(AsyncDriver::PostgresqlAsyncpg)
///     .username("prefect")
///     .password("prefect_password")
///     .database("postgres")
///     .build()
///     .unwrap();
///
/// assert!(credentials.async_supported());
/// assert_eq!(
///     credentials.rendered_url().to_string(),
///     "postgresql+asyncpg://prefect:***@/postgres"
/// );
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "CredentialsBuilder")]
pub struct DatabaseCredentials {
    fields: CredentialsBuilder,
    rendered_url: DatabaseUrl,
    async_supported: bool,
}

impl DatabaseCredentials {
    pub fn builder() -> CredentialsBuilder {
        CredentialsBuilder::new()
    }

    /// Build credentials from a single TOML table of descriptor fields.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        toml::from_str::<CredentialsBuilder>(toml)?.build()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn driver(&self) -> Option<&Driver> {
        self.fields.driver.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.fields.username.as_deref()
    }

    pub fn password(&self) -> Option<&SecretString> {
        self.fields.password.as_ref()
    }

    pub fn database(&self) -> Option<&str> {
        self.fields.database.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.fields.host.as_deref()
    }

    pub fn port(&self) -> Option<&str> {
        self.fields.port.as_deref()
    }

    pub fn query(&self) -> Option<&BTreeMap<String, String>> {
        self.fields.query.as_ref()
    }

    /// The URL exactly as it was supplied, if one was.
    pub fn url(&self) -> Option<&UrlSource> {
        self.fields.url.as_ref()
    }

    pub fn connect_args(&self) -> Option<&ConnectArgs> {
        self.fields.connect_args.as_ref()
    }

    /// The canonical URL engines are built from.
    pub fn rendered_url(&self) -> &DatabaseUrl {
        &self.rendered_url
    }

    /// Whether engines are built with the async factory.
    pub fn async_supported(&self) -> bool {
        self.async_supported
    }

    /// Build a new engine with the default dialects.
    ///
    /// Each call returns a fresh, unpooled engine. No connection is opened.
    pub fn get_engine(&self) -> Result<Engine> {
        self.get_engine_with(&EngineFactory::default())
    }

    /// Build a new engine using the dialects registered in `factory`.
    pub fn get_engine_with(&self, factory: &EngineFactory) -> Result<Engine> {
        let url = self.rendered_url.clone();
        let connect_args = self.fields.connect_args.clone().unwrap_or_default();
        if self.async_supported {
            factory
                .create_async_engine(url, connect_args, PoolPolicy::NullPool)
                .map(Engine::Async)
        } else {
            factory
                .create_engine(url, connect_args, PoolPolicy::NullPool)
                .map(Engine::Sync)
        }
    }
}

impl TryFrom<CredentialsBuilder> for DatabaseCredentials {
    type Error = CredentialsError;

    fn try_from(builder: CredentialsBuilder) -> Result<Self> {
        builder.build()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn port_from_text_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Port>::deserialize(deserializer)?.map(|port| match port {
        Port::Text(text) => text,
        Port::Number(number) => number.to_string(),
    }))
}
