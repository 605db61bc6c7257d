// Diary records and the stores that keep them

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use daybook_auth::{AuthError, IdentityStore, PasswordHasher, PasswordVerifier};
use daybook_core::Error;
use daybook_core::logging::{debug, error};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;

/// How many days the home page lists.
pub const LATEST_LIMIT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no matching record found")]
    NoRecord,

    #[error("duplicate email")]
    DuplicateEmail,

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;

impl From<ModelError> for Error {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NoRecord => Error::NotFound(err.to_string()),
            other => Error::Internal(other.to_string()),
        }
    }
}

/// One day of intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Day {
    pub id: i64,
    pub calories: i64,
    pub proteins: i64,
    pub fats: i64,
    pub carbs: i64,
    pub fibre: i64,
    pub date: NaiveDate,
}

/// A day that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDay {
    pub calories: i64,
    pub proteins: i64,
    pub fats: i64,
    pub carbs: i64,
    pub fibre: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub hashed_password: String,
    pub created: DateTime<Utc>,
}

#[async_trait]
pub trait DayStore: Send + Sync {
    /// Store a day and return its id.
    async fn insert(&self, day: NewDay) -> ModelResult<i64>;

    async fn get(&self, id: i64) -> ModelResult<Day>;

    /// The most recent days, newest first.
    async fn latest(&self) -> ModelResult<Vec<Day>>;
}

/// Account storage. Credential checks come from [`IdentityStore`].
#[async_trait]
pub trait UserStore: IdentityStore {
    /// Create an account. Fails with [`ModelError::DuplicateEmail`] when the
    /// address is taken.
    async fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<i64>;

    async fn get(&self, id: i64) -> ModelResult<User>;
}

#[derive(Default)]
pub struct MemoryDayStore {
    days: RwLock<BTreeMap<i64, Day>>,
}

impl MemoryDayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DayStore for MemoryDayStore {
    async fn insert(&self, day: NewDay) -> ModelResult<i64> {
        let mut days = self.days.write();
        let id = days.keys().next_back().map_or(1, |last| last + 1);
        days.insert(
            id,
            Day {
                id,
                calories: day.calories,
                proteins: day.proteins,
                fats: day.fats,
                carbs: day.carbs,
                fibre: day.fibre,
                date: day.date,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: i64) -> ModelResult<Day> {
        self.days.read().get(&id).cloned().ok_or(ModelError::NoRecord)
    }

    async fn latest(&self) -> ModelResult<Vec<Day>> {
        Ok(self
            .days
            .read()
            .values()
            .rev()
            .take(LATEST_LIMIT)
            .cloned()
            .collect())
    }
}

/// In-process accounts with bcrypt password hashes.
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
    hasher: PasswordHasher,
    /// Checked against when the email is unknown so both failures cost one
    /// bcrypt verification.
    dummy_hash: Option<String>,
}

impl MemoryUserStore {
    pub fn new(hasher: PasswordHasher) -> Self {
        let dummy_hash = match hasher.hash("daybook-no-such-user") {
            Ok(hash) => Some(hash),
            Err(err) => {
                error!(error = %err, "could not prepare the unknown-user hash");
                None
            }
        };

        Self {
            users: RwLock::new(Vec::new()),
            hasher,
            dummy_hash,
        }
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        self.users.read().iter().find(|u| u.email == email).cloned()
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new(PasswordHasher::default())
    }
}

#[async_trait]
impl IdentityStore for MemoryUserStore {
    async fn authenticate(&self, email: &str, password: &str) -> daybook_auth::Result<i64> {
        let Some(user) = self.find_by_email(email) else {
            debug!("login attempt for unknown email");
            if let Some(dummy) = &self.dummy_hash {
                let _ = self.hasher.verify(password, dummy);
            }
            return Err(AuthError::InvalidCredentials);
        };

        match self.hasher.verify(password, &user.hashed_password) {
            Ok(true) => Ok(user.id),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(err) => {
                error!(user_id = user.id, error = %err, "stored password hash is unusable");
                Err(err)
            }
        }
    }

    async fn exists(&self, id: i64) -> daybook_auth::Result<bool> {
        Ok(self.users.read().iter().any(|u| u.id == id))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<i64> {
        let hashed_password = self.hasher.hash(password)?;

        let mut users = self.users.write();
        if users.iter().any(|u| u.email == email) {
            return Err(ModelError::DuplicateEmail);
        }

        let id = users.last().map_or(1, |last| last.id + 1);
        users.push(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            hashed_password,
            created: Utc::now(),
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> ModelResult<User> {
        self.users
            .read()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(ModelError::NoRecord)
    }
}
