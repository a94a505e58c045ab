//! API credentials and the configured pool.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Which upstream access path a credential authenticates against.
///
/// The two tiers hit physically distinct base URLs and authenticate
/// differently (query parameter vs transport headers). The tier is decided
/// once at configuration load, never re-derived from the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiTier {
    /// Direct provider account; authenticates via the `apikey` parameter.
    Direct,
    /// RapidAPI marketplace account; authenticates via request headers.
    Rapid,
}

impl FromStr for ApiTier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ApiTier::Direct),
            "rapid" => Ok(ApiTier::Rapid),
            other => Err(ConfigError::InvalidTier(other.to_string())),
        }
    }
}

/// One API credential. Immutable after load.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub name: String,
    pub tier: ApiTier,
    token: String,
}

impl Credential {
    pub fn new(name: impl Into<String>, tier: ApiTier, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tier,
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// Keep the secret out of debug/log output.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.name, self.tier)
    }
}

/// The full configured credential pool, in configuration order.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    /// Build a pool. Empty pools and duplicate names are configuration
    /// errors.
    pub fn new(credentials: Vec<Credential>) -> Result<Self, ConfigError> {
        if credentials.is_empty() {
            return Err(ConfigError::EmptyPool);
        }
        for (i, credential) in credentials.iter().enumerate() {
            if credentials[..i].iter().any(|c| c.name == credential.name) {
                return Err(ConfigError::DuplicateCredential(credential.name.clone()));
            }
        }
        Ok(Self { credentials })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Credential> {
        self.credentials.iter().find(|c| c.name == name)
    }

    /// Select a rotation subset by name, preserving configuration order.
    ///
    /// `None` means the whole pool. An explicitly empty selection is an
    /// error (did you forget to choose a pool?), as is any unknown name.
    pub fn select(&self, restriction: Option<&[String]>) -> Result<Vec<Credential>, ConfigError> {
        match restriction {
            None => Ok(self.credentials.clone()),
            Some([]) => Err(ConfigError::EmptyKeySelection),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.get(name)
                        .cloned()
                        .ok_or_else(|| ConfigError::UnknownCredential(name.clone()))
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> CredentialPool {
        CredentialPool::new(vec![
            Credential::new("direct1", ApiTier::Direct, "tok-a"),
            Credential::new("rapid1", ApiTier::Rapid, "tok-b"),
            Credential::new("direct2", ApiTier::Direct, "tok-c"),
        ])
        .unwrap()
    }

    #[test]
    fn tier_parsing() {
        assert_eq!("direct".parse::<ApiTier>().unwrap(), ApiTier::Direct);
        assert_eq!("rapid".parse::<ApiTier>().unwrap(), ApiTier::Rapid);
        assert!("rapidapi".parse::<ApiTier>().is_err());
    }

    #[test]
    fn duplicate_names_rejected() {
        let result = CredentialPool::new(vec![
            Credential::new("k", ApiTier::Direct, "a"),
            Credential::new("k", ApiTier::Rapid, "b"),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateCredential(_))));
    }

    #[test]
    fn empty_pool_rejected() {
        assert!(matches!(
            CredentialPool::new(Vec::new()),
            Err(ConfigError::EmptyPool)
        ));
    }

    #[test]
    fn selection_rules() {
        let p = pool();
        assert_eq!(p.select(None).unwrap().len(), 3);

        let names = vec!["rapid1".to_string(), "direct1".to_string()];
        let some = p.select(Some(names.as_slice())).unwrap();
        assert_eq!(some[0].name, "rapid1");
        assert_eq!(some[1].name, "direct1");

        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            p.select(Some(empty.as_slice())),
            Err(ConfigError::EmptyKeySelection)
        ));
        let ghost = vec!["ghost".to_string()];
        assert!(matches!(
            p.select(Some(ghost.as_slice())),
            Err(ConfigError::UnknownCredential(_))
        ));
    }

    #[test]
    fn display_and_debug_hide_token() {
        let c = Credential::new("direct1", ApiTier::Direct, "super-secret");
        assert!(!format!("{c}").contains("super-secret"));
        assert!(!format!("{c:?}").contains("super-secret"));
    }
}
