use thiserror::Error;

/// Everything that can go wrong between credentials and a finished sync.
///
/// Admission-control and credential errors are raised before any network
/// I/O. Protocol failures are caught at the service boundary and turned
/// into a tagged `SyncResult` so one bad network never stops the
/// scheduler.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or malformed input, caught before any network call
    #[error("credentials_missing: {0}")]
    CredentialsInvalid(String),

    /// Handshake completed but no identifiable session was established
    #[error("login_failed: {0}")]
    LoginFailed(String),

    /// Mid-pagination redirect back to the login page
    #[error("session_expired: network redirected to login mid-fetch")]
    SessionExpired,

    /// Timeout, connection failure, or non-2xx status
    #[error("transport_error: {0}")]
    TransportError(String),

    /// Envelope could not be decrypted; a key/format mismatch, not transient
    #[error("decrypt_failed: {0}")]
    DecryptionFailed(String),

    /// Response body did not parse as the expected JSON shape
    #[error("malformed_response: {0}")]
    MalformedResponse(String),

    /// Plan ceiling reached; distinct message per violated constraint
    #[error("plan_limit: {0}")]
    PlanLimitReached(String),

    #[error("Subscription required")]
    SubscriptionRequired,
}

impl SyncError {
    /// Stable taxonomy token for callers that match on error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::CredentialsInvalid(_) => "credentials_missing",
            Self::LoginFailed(_) => "login_failed",
            Self::SessionExpired => "session_expired",
            Self::TransportError(_) => "transport_error",
            Self::DecryptionFailed(_) => "decrypt_failed",
            Self::MalformedResponse(_) => "malformed_response",
            Self::PlanLimitReached(_) => "plan_limit",
            Self::SubscriptionRequired => "subscription_required",
        }
    }

    /// Whether the error was raised before any network I/O happened
    pub fn is_admission_error(&self) -> bool {
        matches!(
            self,
            Self::CredentialsInvalid(_) | Self::PlanLimitReached(_) | Self::SubscriptionRequired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            SyncError::LoginFailed("x".into()).code(),
            "login_failed"
        );
        assert_eq!(SyncError::SessionExpired.code(), "session_expired");
        assert!(SyncError::SubscriptionRequired.is_admission_error());
        assert!(!SyncError::SessionExpired.is_admission_error());
    }
}
