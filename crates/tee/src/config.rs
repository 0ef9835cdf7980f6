//! Named database registrations.
//!
//! Every query is routed to a database name (`"default"` unless the builder
//! calls `using`). A registration pairs connection parameters with the
//! [`Connector`] that opens sessions for them.
//!
//! ```ignore
//! tee::set_default_db(DbConfig::new("localhost", 5432, "app", "secret", "app"))?;
//! tee::set_db("analytics", DbConfig::new("replica", 5432, "ro", "secret", "events"))?;
//! ```
//!
//! Registrations can also come from TOML:
//!
//! ```toml
//! [default]
//! host = "localhost"
//! user = "app"
//! password = "${APP_DB_PASSWORD}"
//! database = "app"
//!
//! [databases.analytics]
//! host = "replica"
//! user = "ro"
//! database = "events"
//! tls = "require"
//! ```

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::client::{Connection, Connector};
use crate::error::{OrmError, OrmResult};

/// Name of the database used when a builder does not pick one.
pub const DEFAULT_DB: &str = "default";

/// TLS negotiation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

/// Connection parameters of one database.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub tls: TlsMode,
}

impl DbConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            tls: TlsMode::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    fn expand_env(&mut self) -> OrmResult<()> {
        for s in [
            &mut self.host,
            &mut self.user,
            &mut self.password,
            &mut self.database,
        ] {
            *s = expand_env_vars(s)?;
        }
        Ok(())
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::new("localhost", 5432, "postgres", "", "postgres")
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("tls", &self.tls)
            .finish()
    }
}

#[derive(Clone)]
struct Registration {
    config: DbConfig,
    connector: Arc<dyn Connector>,
}

static REGISTRY: LazyLock<RwLock<HashMap<String, Registration>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn register(name: &str, config: DbConfig, connector: Arc<dyn Connector>) {
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    registry.insert(name.to_string(), Registration { config, connector });
}

/// Register the `"default"` database, served by the built-in Postgres driver.
#[cfg(feature = "postgres")]
pub fn set_default_db(config: DbConfig) -> OrmResult<()> {
    set_default_db_with_connector(config, Arc::new(crate::postgres::PostgresConnector))
}

/// Register a named database, served by the built-in Postgres driver.
///
/// `"default"` is reserved; use [`set_default_db`] for it.
#[cfg(feature = "postgres")]
pub fn set_db(name: &str, config: DbConfig) -> OrmResult<()> {
    set_db_with_connector(name, config, Arc::new(crate::postgres::PostgresConnector))
}

/// Register the `"default"` database with a custom driver.
pub fn set_default_db_with_connector(
    config: DbConfig,
    connector: Arc<dyn Connector>,
) -> OrmResult<()> {
    register(DEFAULT_DB, config, connector);
    Ok(())
}

/// Register a named database with a custom driver.
pub fn set_db_with_connector(
    name: &str,
    config: DbConfig,
    connector: Arc<dyn Connector>,
) -> OrmResult<()> {
    if name == DEFAULT_DB {
        return Err(OrmError::ReservedName(name.to_string()));
    }
    register(name, config, connector);
    Ok(())
}

/// Connection parameters registered under `name`.
pub fn get_db(name: &str) -> OrmResult<DbConfig> {
    lookup(name).map(|r| r.config)
}

/// Names of all registered databases, sorted.
pub fn registered_dbs() -> Vec<String> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<String> = registry.keys().cloned().collect();
    names.sort();
    names
}

fn lookup(name: &str) -> OrmResult<Registration> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    registry
        .get(name)
        .cloned()
        .ok_or_else(|| OrmError::UnknownDatabase(name.to_string()))
}

/// Open a session on a registered database.
pub(crate) async fn connect(name: &str, autocommit: bool) -> OrmResult<Arc<dyn Connection>> {
    let registration = lookup(name)?;
    #[cfg(feature = "tracing")]
    tracing::trace!(target: "tee.conn", db = name, autocommit, "opening connection");
    registration
        .connector
        .connect(&registration.config, autocommit)
        .await
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    default: Option<DbConfig>,
    #[serde(default)]
    databases: BTreeMap<String, DbConfig>,
}

/// Register every database of a TOML document with the built-in Postgres
/// driver. Returns the registered names.
#[cfg(feature = "postgres")]
pub fn load_toml(source: &str) -> OrmResult<Vec<String>> {
    load_toml_with_connector(source, Arc::new(crate::postgres::PostgresConnector))
}

/// Register every database of a TOML document with a custom driver.
///
/// `[default]` becomes the default database and each `[databases.<name>]`
/// table a named one. `${VAR}` references in string values are expanded from
/// the environment. Nothing is registered if any entry is invalid.
pub fn load_toml_with_connector(
    source: &str,
    connector: Arc<dyn Connector>,
) -> OrmResult<Vec<String>> {
    let file: ConfigFile = toml::from_str(source)?;

    let mut entries = Vec::new();
    if let Some(config) = file.default {
        entries.push((DEFAULT_DB.to_string(), config));
    }
    for (name, config) in file.databases {
        if name == DEFAULT_DB {
            return Err(OrmError::ReservedName(name));
        }
        entries.push((name, config));
    }
    for (_, config) in &mut entries {
        config.expand_env()?;
    }

    let mut names = Vec::with_capacity(entries.len());
    for (name, config) in entries {
        register(&name, config, Arc::clone(&connector));
        names.push(name);
    }
    Ok(names)
}

/// Substitutes every `${VAR}` in `input` from the process environment.
fn expand_env_vars(input: &str) -> OrmResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let (key, tail) = after
            .split_once('}')
            .ok_or_else(|| OrmError::Config(format!("unterminated `${{` in {input:?}")))?;
        let value = Some(key)
            .filter(|k| !k.is_empty())
            .and_then(|k| std::env::var(k).ok())
            .ok_or_else(|| OrmError::Config(format!("cannot expand `${{{key}}}` in {input:?}")))?;
        out.push_str(&value);
        rest = tail;
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ExecOutcome;
    use crate::row::Row;
    use crate::value::Value;
    use async_trait::async_trait;

    struct NullConnector;

    #[async_trait]
    impl Connector for NullConnector {
        async fn connect(&self, _: &DbConfig, _: bool) -> OrmResult<Arc<dyn Connection>> {
            Ok(Arc::new(NullConnection))
        }
    }

    struct NullConnection;

    #[async_trait]
    impl Connection for NullConnection {
        async fn query(&self, _: &str, _: &[Value]) -> OrmResult<Vec<Row>> {
            Ok(Vec::new())
        }
        async fn exec(&self, _: &str, _: &[Value]) -> OrmResult<ExecOutcome> {
            Ok(ExecOutcome::default())
        }
        async fn exec_many(&self, _: &str, _: &[Vec<Value>]) -> OrmResult<u64> {
            Ok(0)
        }
        async fn commit(&self) -> OrmResult<()> {
            Ok(())
        }
        async fn rollback(&self) -> OrmResult<()> {
            Ok(())
        }
        async fn close(&self) -> OrmResult<()> {
            Ok(())
        }
    }

    #[test]
    fn default_name_is_reserved() {
        let err = set_db_with_connector("default", DbConfig::default(), Arc::new(NullConnector))
            .unwrap_err();
        assert!(matches!(err, OrmError::ReservedName(ref n) if n == "default"));
    }

    #[test]
    fn unknown_database_is_reported() {
        let err = get_db("config_tests_never_registered").unwrap_err();
        assert!(matches!(err, OrmError::UnknownDatabase(_)));
    }

    #[test]
    fn load_toml_registers_named_tables() {
        let names = load_toml_with_connector(
            r#"
            [databases.config_tests_reports]
            host = "reports.internal"
            port = 6543
            user = "ro"
            database = "reports"
            tls = "require"
            "#,
            Arc::new(NullConnector),
        )
        .unwrap();
        assert_eq!(names, ["config_tests_reports"]);

        let config = get_db("config_tests_reports").unwrap();
        assert_eq!(config.host, "reports.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.password, "");
        assert_eq!(config.tls, TlsMode::Require);
    }

    #[test]
    fn load_toml_rejects_default_under_databases() {
        let err = load_toml_with_connector(
            "[databases.default]\nhost = \"x\"\n",
            Arc::new(NullConnector),
        )
        .unwrap_err();
        assert!(matches!(err, OrmError::ReservedName(_)));
    }

    #[test]
    fn env_references_are_expanded() {
        // PATH is set in every test environment.
        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_env_vars("${PATH}").unwrap(), path);
        assert_eq!(expand_env_vars("plain").unwrap(), "plain");
        assert_eq!(
            expand_env_vars("postgres://${PATH}@host").unwrap(),
            format!("postgres://{path}@host")
        );
    }

    #[test]
    fn bad_env_references_are_config_errors() {
        for input in ["${UNTERMINATED", "${}", "${TEE_CONFIG_TESTS_SURELY_UNSET}"] {
            let err = expand_env_vars(input).unwrap_err();
            assert!(matches!(err, OrmError::Config(ref m) if m.contains(input)), "{input}");
        }
    }

    #[test]
    fn debug_hides_password() {
        let config = DbConfig::default().password("hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
