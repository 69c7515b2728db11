use crate::error::JobError;
use std::fmt;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

/// An opaque API credential, or the explicit absence of one.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Present(String),
    Absent,
}

impl Credential {
    /// Blank or whitespace-only input is treated as absent.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if !v.is_empty() => Credential::Present(v.to_string()),
            _ => Credential::Absent,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Credential::Present(_))
    }

    /// Must be checked before any remote operation.
    pub fn require(&self) -> Result<&str, JobError> {
        match self {
            Credential::Present(v) => Ok(v),
            Credential::Absent => Err(JobError::NoCredential),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Present(_) => f.write_str("Credential::Present(<redacted>)"),
            Credential::Absent => f.write_str("Credential::Absent"),
        }
    }
}

pub trait CredentialProvider {
    fn acquire(&self) -> Credential;
}

pub struct StaticCredential(pub Option<String>);

impl CredentialProvider for StaticCredential {
    fn acquire(&self) -> Credential {
        Credential::from_raw(self.0.as_deref())
    }
}

pub struct EnvCredential {
    pub var: String,
}

impl CredentialProvider for EnvCredential {
    fn acquire(&self) -> Credential {
        if self.var.is_empty() {
            return Credential::Absent;
        }
        let cred = Credential::from_raw(std::env::var(&self.var).ok().as_deref());
        debug!(var = %self.var, present = cred.is_present(), "credential from environment");
        cred
    }
}

/// Asks on stderr and reads one line from stdin.
pub struct PromptCredential {
    pub prompt: String,
}

impl CredentialProvider for PromptCredential {
    fn acquire(&self) -> Credential {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{}", self.prompt);
        let _ = stderr.flush();

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(_) => Credential::from_raw(Some(&line)),
            Err(err) => {
                warn!("reading credential from stdin failed: {err}");
                Credential::Absent
            }
        }
    }
}

/// Tries each provider in order and keeps the first present credential.
#[derive(Default)]
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl CredentialProvider for CredentialChain {
    fn acquire(&self) -> Credential {
        self.providers
            .iter()
            .map(|p| p.acquire())
            .find(Credential::is_present)
            .unwrap_or(Credential::Absent)
    }
}
