//! Configuration types and parsing for config.yml

use crate::error::{CoreError, CoreResult};
use crate::secrets::SecretStore;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// `--database` value meaning "use the database flagged `default: true`"
pub const DEFAULT_DATABASE: &str = "default!";

/// Fallback directory searched when the config path does not exist
pub const SYSTEM_CONFIG_DIR: &str = "/etc/migrant";

/// Main configuration from config.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root directory holding one migration folder per database
    #[serde(default = "default_migrations")]
    pub migrations: String,

    /// Directory scanned for seed files when none are given explicitly
    #[serde(default = "default_seeds")]
    pub seeds: String,

    /// Named target databases
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseConfig>,

    /// Named secret sources referenced by `SECRET://source/key` values
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretSourceConfig>,
}

/// Database driver selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
    /// SQLite
    Sqlite,
    /// MySQL
    MySql,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Sqlite => write!(f, "sqlite"),
            DbType::MySql => write!(f, "mysql"),
        }
    }
}

/// Connection settings for one target database
///
/// File-based drivers take `uri` as a path. MySQL takes either a full
/// `mysql://` URL in `uri` or the separate `user`/`pass`/`host`/`port`/`prms`
/// components, each of which may be a secret reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Name of the entry in the `databases` block (filled in on lookup)
    #[serde(skip)]
    pub name: String,

    /// Driver used to open the connection
    #[serde(default)]
    pub driver: DbType,

    /// Connection string: a file path, `:memory:` or a MySQL URL
    #[serde(default)]
    pub uri: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pass: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,

    /// Accepts a number or a string so it can hold a secret reference
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "String::is_empty"
    )]
    pub port: String,

    /// Extra connection parameters appended as the URL query string
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prms: String,

    /// Whether this database is selected when no name is given
    #[serde(default)]
    pub default: bool,
}

impl DatabaseConfig {
    /// Return a copy with every secret reference substituted.
    ///
    /// An explicit `uri` wins. Otherwise a MySQL URL is assembled from the
    /// components, naming the database after this config entry.
    pub fn resolved(&self, secrets: &SecretStore) -> CoreResult<Self> {
        if !self.uri.is_empty() {
            return Ok(Self {
                uri: secrets.resolve(&self.uri)?,
                ..self.clone()
            });
        }

        let mut resolved = Self {
            user: secrets.resolve(&self.user)?,
            pass: secrets.resolve(&self.pass)?,
            host: secrets.resolve(&self.host)?,
            port: secrets.resolve(&self.port)?,
            prms: secrets.resolve(&self.prms)?,
            ..self.clone()
        };
        resolved.uri = resolved.component_uri()?;
        Ok(resolved)
    }

    fn component_uri(&self) -> CoreResult<String> {
        let invalid = |message: String| CoreError::ConfigInvalid { message };

        let components = [&self.user, &self.pass, &self.host, &self.port];
        if components.iter().any(|c| c.is_empty()) {
            return Err(invalid(format!(
                "database '{}' has no uri and not enough components to build one \
                 (user, pass, host and port are required)",
                self.name
            )));
        }

        let port: u16 = self.port.parse().map_err(|_| {
            invalid(format!(
                "database '{}' has an invalid port '{}'",
                self.name, self.port
            ))
        })?;

        let mut url = Url::parse(&format!("mysql://{}:{}", self.host, port)).map_err(|e| {
            invalid(format!("database '{}' has an invalid host: {}", self.name, e))
        })?;
        url.set_username(&self.user)
            .and_then(|()| url.set_password(Some(&self.pass)))
            .map_err(|()| invalid(format!("database '{}' cannot carry credentials", self.name)))?;
        url.set_path(&self.name);
        if !self.prms.is_empty() {
            url.set_query(Some(&self.prms));
        }
        Ok(url.to_string())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    })
}

/// Secret source driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretDriver {
    /// Flat JSON object of string values stored in a local file
    #[serde(rename = "json")]
    Json,
    /// AWS Secrets Manager
    #[serde(rename = "aws-secretsmanager")]
    AwsSecretsManager,
}

impl std::fmt::Display for SecretDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretDriver::Json => write!(f, "json"),
            SecretDriver::AwsSecretsManager => write!(f, "aws-secretsmanager"),
        }
    }
}

/// One entry of the `secrets` block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretSourceConfig {
    /// Loader used for this source
    pub driver: SecretDriver,

    /// Location of the source (file path for `json`)
    pub uri: String,
}

fn default_migrations() -> String {
    "./migrations".to_string()
}

fn default_seeds() -> String {
    "./seeds".to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Find and load the config file named on the command line
    ///
    /// The path is used as given when it exists; otherwise its file name is
    /// looked up in [`SYSTEM_CONFIG_DIR`].
    pub fn discover(path: &Path) -> CoreResult<Self> {
        let located = Self::locate(path, Path::new(SYSTEM_CONFIG_DIR))?;
        log::debug!("Using config file {}", located.display());
        Self::load(&located)
    }

    pub(crate) fn locate(path: &Path, fallback_dir: &Path) -> CoreResult<PathBuf> {
        if path.exists() {
            return Ok(path.to_path_buf());
        }

        if let Some(file_name) = path.file_name() {
            let candidate = fallback_dir.join(file_name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        Err(CoreError::ConfigNotFound {
            path: path.display().to_string(),
        })
    }

    fn validate(&self) -> CoreResult<()> {
        if self.migrations.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "'migrations' must not be empty".to_string(),
            });
        }

        for (name, db) in &self.databases {
            // MySQL may build its uri from components at resolve time
            if db.uri.trim().is_empty() && db.driver != DbType::MySql {
                return Err(CoreError::ConfigInvalid {
                    message: format!("database '{}' has an empty uri", name),
                });
            }
        }

        Ok(())
    }

    /// Names of all configured databases, sorted
    pub fn database_names(&self) -> Vec<&str> {
        self.databases.keys().map(String::as_str).collect()
    }

    /// Look up a database by name, or the default one for [`DEFAULT_DATABASE`]
    pub fn find_database(&self, name: &str) -> CoreResult<DatabaseConfig> {
        let name = if name == DEFAULT_DATABASE {
            self.default_database_name()?
        } else {
            name
        };

        let db = self
            .databases
            .get(name)
            .ok_or_else(|| CoreError::DatabaseNotFound {
                name: name.to_string(),
                available: self.database_names().join(", "),
            })?;

        Ok(DatabaseConfig {
            name: name.to_string(),
            ..db.clone()
        })
    }

    fn default_database_name(&self) -> CoreResult<&str> {
        let defaults: Vec<&str> = self
            .databases
            .iter()
            .filter(|(_, db)| db.default)
            .map(|(name, _)| name.as_str())
            .collect();

        match defaults.as_slice() {
            [] => Err(CoreError::NoDefaultDatabase),
            [only] => Ok(*only),
            many => Err(CoreError::ConfigInvalid {
                message: format!(
                    "more than one database is marked default: {}",
                    many.join(", ")
                ),
            }),
        }
    }

    /// Migration directory for a database: `<migrations>/<database name>`
    pub fn migrations_dir(&self, db: &DatabaseConfig) -> CoreResult<PathBuf> {
        let dir = Path::new(&self.migrations).join(&db.name);
        let meta = std::fs::metadata(&dir).map_err(|e| CoreError::io(&dir, e))?;
        if !meta.is_dir() {
            return Err(CoreError::NotADirectory {
                path: dir.display().to_string(),
            });
        }
        Ok(dir)
    }

    /// Directory holding seed files
    pub fn seeds_dir(&self) -> PathBuf {
        PathBuf::from(&self.seeds)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
