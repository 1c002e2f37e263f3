//! Bearer credential supply
//!
//! Token acquisition and refresh happen elsewhere; the engine only asks a
//! `CredentialProvider` once per batch and reuses the answer for every call.

use crate::error::AttendanceError;

/// Bearer token for the remote store
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token
    #[inline]
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Source of the bearer credential
#[cfg_attr(test, mockall::automock)]
pub trait CredentialProvider: Send + Sync {
    /// Current credential, `None` when signed out
    fn bearer_token(&self) -> Option<Credential>;
}

/// Resolve a credential or fail before any I/O
///
/// # Errors
/// `AttendanceError::MissingCredential` when the provider has nothing, or an
/// empty token.
pub fn require_credential(
    provider: &dyn CredentialProvider,
) -> Result<Credential, AttendanceError> {
    match provider.bearer_token() {
        Some(credential) if !credential.token().trim().is_empty() => Ok(credential),
        _ => Err(AttendanceError::MissingCredential),
    }
}

/// Fixed credential (or a fixed absence of one)
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    credential: Option<Credential>,
}

impl StaticCredentials {
    /// Provider that always returns `token`
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            credential: Some(Credential::bearer(token)),
        }
    }

    /// Provider with no credential
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<Credential> {
        self.credential.clone()
    }
}

/// Reads the token from an environment variable on each request
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    /// Environment variable read by default
    pub const DEFAULT_VAR: &'static str = "ROLLCALL_TOKEN";

    /// Provider reading `var`
    #[inline]
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VAR)
    }
}

impl CredentialProvider for EnvCredentials {
    fn bearer_token(&self) -> Option<Credential> {
        std::env::var(&self.var).ok().map(Credential::bearer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let credential = Credential::bearer("secret-token");
        assert_eq!(format!("{:?}", credential), "Credential(<redacted>)");
    }

    #[test]
    fn require_credential_rejects_missing_and_blank() {
        assert!(matches!(
            require_credential(&StaticCredentials::none()),
            Err(AttendanceError::MissingCredential)
        ));
        assert!(matches!(
            require_credential(&StaticCredentials::new("  ")),
            Err(AttendanceError::MissingCredential)
        ));
        assert_eq!(
            require_credential(&StaticCredentials::new("abc")).unwrap().token(),
            "abc"
        );
    }

    #[test]
    fn provider_is_asked_exactly_once() {
        let mut provider = MockCredentialProvider::new();
        provider
            .expect_bearer_token()
            .times(1)
            .returning(|| Some(Credential::bearer("t")));

        assert!(require_credential(&provider).is_ok());
    }

    #[test]
    fn env_provider_reads_named_variable() {
        let var = "ROLLCALL_TEST_TOKEN_ENV_PROVIDER";
        std::env::set_var(var, "from-env");
        let provider = EnvCredentials::new(var);
        assert_eq!(provider.bearer_token().unwrap().token(), "from-env");
        std::env::remove_var(var);
        assert!(provider.bearer_token().is_none());
    }
}
