use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::duration::serde_duration;

/// One certificate to issue
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SingleConfig {
    #[serde(default = "default_common_name")]
    pub common_name: String,
    #[serde(default = "default_alternative_names")]
    pub alternative_names: Vec<String>,
    #[serde(default = "default_expires", with = "serde_duration")]
    pub expires: Duration,
}

impl Default for SingleConfig {
    fn default() -> Self {
        Self {
            common_name: default_common_name(),
            alternative_names: default_alternative_names(),
            expires: default_expires(),
        }
    }
}

pub fn default_common_name() -> String {
    "localhost".to_string()
}

pub fn default_alternative_names() -> Vec<String> {
    vec!["localhost".to_string()]
}

pub fn default_expires() -> Duration {
    Duration::from_secs(365 * 24 * 60 * 60) // 1 year
}

/// Certificates to issue from a single intermediate, in order
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    pub values: Vec<SingleConfig>,
    #[serde(default)]
    pub issuer: IssuerSettings,
}

/// Single-certificate configuration file, optionally with issuer settings
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SingleFile {
    #[serde(flatten)]
    pub single: PartialSingle,
    #[serde(default)]
    pub issuer: IssuerSettings,
}

/// A single-certificate entry where every field may be left to the command line
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartialSingle {
    pub common_name: Option<String>,
    pub alternative_names: Option<Vec<String>>,
    #[serde(default, deserialize_with = "optional_duration")]
    pub expires: Option<Duration>,
}

impl PartialSingle {
    /// Merge command line values over this file entry.
    ///
    /// Each field comes from `flags` when set, otherwise from the file,
    /// otherwise from the defaults.
    pub fn resolve(self, flags: PartialSingle) -> SingleConfig {
        SingleConfig {
            common_name: flags
                .common_name
                .or(self.common_name)
                .unwrap_or_else(default_common_name),
            alternative_names: flags
                .alternative_names
                .or(self.alternative_names)
                .unwrap_or_else(default_alternative_names),
            expires: flags
                .expires
                .or(self.expires)
                .unwrap_or_else(default_expires),
        }
    }
}

fn optional_duration<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_duration::deserialize(deserializer).map(Some)
}

/// Settings shared by every authority and leaf in one issuance run
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSettings {
    #[serde(default)]
    pub subject: SubjectDefaults,
    #[serde(default)]
    pub serial: SerialPolicy,
    /// Deepest allowed authority, counting the root as 0. Unlimited when absent.
    #[serde(default)]
    pub max_depth: Option<u32>,
}

/// Subject fields placed next to the common name of every certificate
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDefaults {
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_province")]
    pub province: String,
    #[serde(default = "default_locality")]
    pub locality: String,
    #[serde(default = "default_street_address")]
    pub street_address: String,
    #[serde(default = "default_postal_code")]
    pub postal_code: String,
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default = "default_organizational_unit")]
    pub organizational_unit: String,
}

impl Default for SubjectDefaults {
    fn default() -> Self {
        Self {
            country: default_country(),
            province: default_province(),
            locality: default_locality(),
            street_address: default_street_address(),
            postal_code: default_postal_code(),
            organization: default_organization(),
            organizational_unit: default_organizational_unit(),
        }
    }
}

fn default_country() -> String {
    "US".to_string()
}

fn default_province() -> String {
    "Virginia".to_string()
}

fn default_locality() -> String {
    "Alexandria".to_string()
}

fn default_street_address() -> String {
    "110 S. Union St, Floor 2".to_string()
}

fn default_postal_code() -> String {
    "22314".to_string()
}

fn default_organization() -> String {
    "Decipher Technology Studios".to_string()
}

fn default_organizational_unit() -> String {
    "Engineering".to_string()
}

/// How certificate serial numbers are chosen
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SerialPolicy {
    /// Unix timestamp in seconds at creation. Collides within one second.
    #[default]
    UnixTimestamp,
    /// 128 random bits
    Random128,
}

/// Configuration file formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(anyhow!(
                "Unsupported config file extension: {}",
                path.display()
            )),
        }
    }

    pub fn parse<T: serde::de::DeserializeOwned>(self, contents: &str) -> Result<T> {
        let parsed = match self {
            ConfigFormat::Toml => toml::from_str(contents).context("Failed to parse TOML config")?,
            ConfigFormat::Yaml => {
                serde_yaml::from_str(contents).context("Failed to parse YAML config")?
            }
            ConfigFormat::Json => {
                serde_json::from_str(contents).context("Failed to parse JSON config")?
            }
        };
        Ok(parsed)
    }
}

fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let format = ConfigFormat::from_path(path)?;
    let config_str = fs::read_to_string(path)
        .context(format!("Failed to read config file: {}", path.display()))?;
    format
        .parse(&config_str)
        .context(format!("Failed to load config file: {}", path.display()))
}

impl BatchConfig {
    /// Load a batch description from a TOML, YAML or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        load(path)
    }
}

impl SingleFile {
    /// Load a single-certificate description from a TOML, YAML or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        load(path)
    }
}
