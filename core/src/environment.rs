//! Environment module - dependency injection traits
//!
//! External dependencies that are not storage or indexing live here. They are
//! injected through the lifecycle environment so tests can substitute
//! deterministic implementations.

use crate::record::UserId;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use exhibits_core::environment::{Clock, SystemClock};
///
/// let now = SystemClock.now();
/// assert!(now.timestamp() > 0);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Decides whether a user may bypass lock ownership.
pub trait Authorizer: Send + Sync {
    /// Whether `user` has administrator privilege.
    fn is_admin(&self, user: &UserId) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Allow-list authorizer: the listed users are administrators.
#[derive(Debug, Clone, Default)]
pub struct AdminList {
    admins: HashSet<UserId>,
}

impl AdminList {
    /// Build from a list of administrator ids.
    #[must_use]
    pub fn new(admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    /// Parse a comma-separated id list, ignoring blanks.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(UserId::new),
        )
    }

    /// Number of configured administrators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.admins.len()
    }

    /// Whether no administrator is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

impl Authorizer for AdminList {
    fn is_admin(&self, user: &UserId) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        let admin = self.admins.contains(user);
        Box::pin(async move { admin })
    }
}
