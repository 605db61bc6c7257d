// Identity store seam

use crate::Result;
use async_trait::async_trait;

/// Where user identities live.
///
/// `authenticate` must return [`AuthError::InvalidCredentials`] for both an
/// unknown email and a wrong password; any other error means the store
/// itself failed.
///
/// [`AuthError::InvalidCredentials`]: crate::AuthError::InvalidCredentials
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Check credentials and return the user's id.
    async fn authenticate(&self, email: &str, password: &str) -> Result<i64>;

    /// Whether a user with this id still exists.
    async fn exists(&self, id: i64) -> Result<bool>;
}
