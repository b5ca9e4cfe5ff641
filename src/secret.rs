//! Secret lookup. Storage of secrets is somebody else's job; the pipeline only
//! asks for a value by id.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("secret {0} is not set")]
    Missing(String),
    #[error("secret {0} is not valid unicode")]
    NotUnicode(String),
}

pub trait SecretSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, id: &str) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

/// Reads secrets from environment variables, optionally prefixed.
#[derive(Debug, Default, Clone)]
pub struct EnvSecrets {
    prefix: Option<String>,
}

impl EnvSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn variable(&self, id: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{id}"),
            None => id.to_owned(),
        }
    }

    fn lookup(&self, id: &str, read: impl Fn(&str) -> Result<String, std::env::VarError>) -> Result<String, Error> {
        let name = self.variable(id);
        read(&name).map_err(|error| match error {
            std::env::VarError::NotPresent => Error::Missing(name),
            std::env::VarError::NotUnicode(_) => Error::NotUnicode(name),
        })
    }
}

impl SecretSource for EnvSecrets {
    type Error = Error;

    async fn get(&self, id: &str) -> Result<String, Self::Error> {
        self.lookup(id, |name| std::env::var(name))
    }
}
