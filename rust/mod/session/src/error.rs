use escrow_client::ApiError;

/// Why there is no session.
///
/// The guard handles every variant the same way (redirect, no visible
/// error); the distinction exists for logging and for the auth flows,
/// which do surface their errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Nothing stored. Not a failure; no request was made.
    #[error("no stored credential")]
    NoCredential,

    /// The backend refused the credential, or could not be reached.
    #[error("session rejected: {0}")]
    Rejected(#[source] ApiError),

    #[error("password confirmation does not match")]
    PasswordMismatch,

    /// A login, registration or credential write failed.
    #[error(transparent)]
    Request(#[from] ApiError),
}

impl AuthError {
    /// Message suitable for showing next to a sign-in form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::NoCredential | AuthError::Rejected(_) => {
                "Your session has ended. Please sign in again.".to_string()
            }
            AuthError::PasswordMismatch => "The passwords do not match.".to_string(),
            AuthError::Request(ApiError::Validation { message }) => message.clone(),
            AuthError::Request(ApiError::Network(_)) => {
                "Could not reach the server. Check your connection.".to_string()
            }
            AuthError::Request(e) => e.to_string(),
        }
    }
}
