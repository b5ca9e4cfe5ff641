use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{paths::DEFAULT_OUTPUT_FILENAME, source::airtable};

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_output_filename() -> String {
    DEFAULT_OUTPUT_FILENAME.to_owned()
}

fn default_presign_ttl_minutes() -> u64 {
    10
}

#[derive(Deserialize, Clone, Debug)]
pub struct Source {
    pub api_base: Option<url::Url>,
    pub web_base: Option<url::Url>,
    /// Id handed to the secret source to obtain the API token.
    pub secret: String,
}

impl Source {
    pub fn api_base(&self) -> Result<url::Url, url::ParseError> {
        match &self.api_base {
            Some(url) => Ok(url.clone()),
            None => airtable::DEFAULT_API_BASE.parse(),
        }
    }

    pub fn web_base(&self) -> Result<url::Url, url::ParseError> {
        match &self.web_base {
            Some(url) => Ok(url.clone()),
            None => airtable::DEFAULT_WEB_BASE.parse(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub enum Storage {
    S3 {
        bucket: String,
        region: Option<String>,
        endpoint: Option<url::Url>,
    },
    Local {
        dir: PathBuf,
    },
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub source: Source,
    pub storage: Storage,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    #[serde(default = "default_output_filename")]
    pub output_filename: String,
    #[serde(default = "default_presign_ttl_minutes")]
    pub presign_ttl_minutes: u64,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.source.secret.trim().is_empty() {
            return Err("source.secret must not be empty".into());
        }
        if let Storage::S3 { bucket, .. } = &self.storage {
            if bucket.trim().is_empty() {
                return Err("storage.S3.bucket must not be empty".into());
            }
        }
        if self.presign_ttl_minutes == 0 {
            return Err("presign_ttl_minutes must be positive".into());
        }
        if self.output_filename.is_empty() || self.output_filename.contains(['/', '\\']) {
            return Err(format!(
                "output_filename must be a plain file name, got {:?}",
                self.output_filename
            ));
        }
        Ok(())
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_minutes * 60)
    }
}
