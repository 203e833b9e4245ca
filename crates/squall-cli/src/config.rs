use anyhow::{bail, Context};
use serde::Deserialize;
use std::path::Path;

/// One object-storage endpoint. Credentials stay in the config file and are
/// never logged.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub access_key: String,
    pub secret_key: String,
    pub url: String,
    #[serde(default)]
    pub ssl: bool,
}

/// Where one class of objects goes: an endpoint by name, a bucket, and an
/// optional key prefix inside it.
#[derive(Debug, Clone, Deserialize)]
pub struct BucketPath {
    pub endpoint: String,
    pub bucket: String,
    #[serde(default)]
    pub sub_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub endpoints: Vec<Endpoint>,
    pub data: BucketPath,
    pub pieces: BucketPath,
}

impl Config {
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse(&raw).with_context(|| format!("in config file {}", path.display()))
}

fn parse(raw: &str) -> anyhow::Result<Config> {
    let config: Config = serde_json::from_str(raw)?;
    for bucket in [&config.data, &config.pieces] {
        if config.endpoint(&bucket.endpoint).is_none() {
            bail!(
                "bucket `{}` references unknown endpoint `{}`",
                bucket.bucket,
                bucket.endpoint
            );
        }
    }
    Ok(config)
}
