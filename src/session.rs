//! Typed view of the logged-in user, handed to request handlers instead of a
//! bag of untyped session attributes.

use chrono::{DateTime, Utc};

use crate::store::User;
use crate::subscription;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub user_name: String,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            user_name: user.user_name.clone(),
            subscription_end_date: user.subscription_end_date,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    current_user: Option<AuthenticatedUser>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self { current_user: None }
    }

    pub fn authenticated(user: AuthenticatedUser) -> Self {
        Self {
            current_user: Some(user),
        }
    }

    pub fn current_user(&self) -> Option<&AuthenticatedUser> {
        self.current_user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    /// Anonymous sessions never pass the subscription gate.
    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.current_user
            .as_ref()
            .map(|user| subscription::is_active(user.subscription_end_date, now))
            .unwrap_or(false)
    }
}
