//! Secret sources and `SECRET://source/key` substitution

use crate::config::{Config, SecretDriver, SecretSourceConfig};
use crate::error::{CoreError, CoreResult};
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use std::collections::HashMap;
use std::path::Path;

/// Prefix marking a config value as a secret reference
pub const SECRET_PROTOCOL: &str = "SECRET://";

/// Secrets loaded from every configured source, keyed by source name
#[derive(Debug, Default, Clone)]
pub struct SecretStore {
    sources: HashMap<String, HashMap<String, String>>,
}

impl SecretStore {
    /// Load every source declared in the `secrets` block
    ///
    /// Remote sources are fetched over the network, so this needs a tokio
    /// runtime.
    pub async fn load(config: &Config) -> CoreResult<Self> {
        let mut store = Self::default();
        for (name, source) in &config.secrets {
            let values = load_source(name, source).await?;
            log::debug!("Loaded {} secrets from source '{}'", values.len(), name);
            store.sources.insert(name.clone(), values);
        }
        Ok(store)
    }

    /// Register a source directly
    pub fn insert_source(&mut self, name: impl Into<String>, values: HashMap<String, String>) {
        self.sources.insert(name.into(), values);
    }

    /// Resolve a value, returning it unchanged unless it is a secret reference
    pub fn resolve(&self, value: &str) -> CoreResult<String> {
        let Some(reference) = value.strip_prefix(SECRET_PROTOCOL) else {
            return Ok(value.to_string());
        };

        let (source_name, key) =
            reference
                .split_once('/')
                .ok_or_else(|| CoreError::ConfigInvalid {
                    message: format!(
                        "secret reference '{}' must have the form {}source/key",
                        value, SECRET_PROTOCOL
                    ),
                })?;

        self.sources
            .get(source_name)
            .and_then(|source| source.get(key))
            .cloned()
            .ok_or_else(|| CoreError::SecretNotFound {
                source_name: source_name.to_string(),
                key: key.to_string(),
            })
    }
}

/// Returns true if the value is a secret reference
pub fn is_secret_uri(value: &str) -> bool {
    value.starts_with(SECRET_PROTOCOL)
}

async fn load_source(
    name: &str,
    source: &SecretSourceConfig,
) -> CoreResult<HashMap<String, String>> {
    match source.driver {
        SecretDriver::Json => load_json_source(Path::new(&source.uri)),
        SecretDriver::AwsSecretsManager => load_aws_source(name, &source.uri).await,
    }
}

fn load_json_source(path: &Path) -> CoreResult<HashMap<String, String>> {
    let meta = std::fs::metadata(path).map_err(|e| CoreError::io(path, e))?;
    if meta.is_dir() {
        return Err(CoreError::ConfigInvalid {
            message: format!(
                "secrets uri must name a json file, not a directory: {}",
                path.display()
            ),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    let values: HashMap<String, String> = serde_json::from_str(&content)?;
    Ok(values)
}

/// Secret name and region parsed from `secret/name?region=eu-west-1`
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct AwsSecretLocation {
    pub(crate) secret_id: String,
    pub(crate) region: String,
}

pub(crate) fn parse_aws_uri(name: &str, uri: &str) -> CoreResult<AwsSecretLocation> {
    let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
    let region = url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "region")
        .map(|(_, value)| value.into_owned())
        .filter(|region| !region.is_empty())
        .ok_or_else(|| CoreError::ConfigInvalid {
            message: format!(
                "you must specify a region for the aws-secretsmanager source: {}",
                name
            ),
        })?;

    if path.is_empty() {
        return Err(CoreError::ConfigInvalid {
            message: format!("aws-secretsmanager source '{}' names no secret", name),
        });
    }

    Ok(AwsSecretLocation {
        secret_id: path.to_string(),
        region,
    })
}

/// Decode a secret payload: a flat JSON object whose scalar values become strings
pub(crate) fn parse_secret_payload(
    name: &str,
    payload: &str,
) -> CoreResult<HashMap<String, String>> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(payload)?;
    object
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(CoreError::SecretSourceFailed {
                        name: name.to_string(),
                        message: format!("value of '{}' is not a scalar: {}", key, other),
                    })
                }
            };
            Ok((key, text))
        })
        .collect()
}

/// Fetch one secret from AWS Secrets Manager using the default credential chain
async fn load_aws_source(name: &str, uri: &str) -> CoreResult<HashMap<String, String>> {
    let location = parse_aws_uri(name, uri)?;
    let failed = |message: String| CoreError::SecretSourceFailed {
        name: name.to_string(),
        message,
    };

    log::debug!(
        "Fetching secret '{}' from AWS Secrets Manager in {}",
        location.secret_id,
        location.region
    );
    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(location.region.clone()))
        .load()
        .await;
    let client = aws_sdk_secretsmanager::Client::new(&sdk_config);

    let output = client
        .get_secret_value()
        .secret_id(&location.secret_id)
        .send()
        .await
        .map_err(|e| failed(DisplayErrorContext(&e).to_string()))?;

    let payload = match (output.secret_string(), output.secret_binary()) {
        (Some(text), _) => text.to_string(),
        (None, Some(blob)) => String::from_utf8(blob.as_ref().to_vec())
            .map_err(|e| failed(format!("binary secret is not UTF-8: {}", e)))?,
        (None, None) => return Err(failed("secret has no value".to_string())),
    };

    parse_secret_payload(name, &payload)
}

#[cfg(test)]
#[path = "secrets_test.rs"]
mod tests;
