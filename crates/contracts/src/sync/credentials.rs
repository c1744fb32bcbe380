use super::cookie_jar::CookieJar;
use super::error::SyncError;
use serde::{Deserialize, Serialize};

/// Session state a successful login leaves behind. A caller may hand it
/// back on the next call to skip re-login for the duration of a fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionArtifacts {
    pub cookies: CookieJar,
    pub csrf_token: Option<String>,
    /// Numeric user id scraped out of a session cookie
    pub user_id: Option<String>,
}

/// Network login credentials, ephemeral per sync attempt.
/// Never persisted by the engine; the caller owns the lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionArtifacts>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: SessionArtifacts) -> Self {
        self.session = Some(session);
        self
    }

    /// Cheap fast-fail before any network I/O
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.email.trim().is_empty() {
            return Err(SyncError::CredentialsInvalid("email is required".into()));
        }
        if !self.email.contains('@') {
            return Err(SyncError::CredentialsInvalid(format!(
                "'{}' is not a valid email",
                self.email
            )));
        }
        if self.password.is_empty() {
            return Err(SyncError::CredentialsInvalid("password is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fail_validation() {
        assert!(Credentials::new("", "pw").validate().is_err());
        assert!(Credentials::new("user@example.com", "").validate().is_err());
        assert!(Credentials::new("not-an-email", "pw").validate().is_err());
        assert!(Credentials::new("user@example.com", "pw").validate().is_ok());
    }
}
