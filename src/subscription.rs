//! Subscription gating and renewal. End dates are compared with strict
//! inequality, so a subscription ending exactly "now" is already expired.

use chrono::{DateTime, Months, Utc};

use crate::store::{StoreError, StoreResult, UserStore};

/// Whether a subscription ending at `end_date` is still active at `now`.
pub fn is_active(end_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(end_date, Some(end) if end > now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendOutcome {
    /// New end date, one year from `now`.
    Extended(DateTime<Utc>),
    /// The current subscription has not run out; renewals never stack.
    Refused,
}

pub fn extend(current_end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ExtendOutcome {
    match current_end {
        Some(end) if end >= now => ExtendOutcome::Refused,
        _ => ExtendOutcome::Extended(now + Months::new(12)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    Renewed(DateTime<Utc>),
    StillActive,
}

/// Extend the user's subscription by a year if it has run out (or never
/// existed), persisting the new end date.
pub fn renew_subscription(
    store: &dyn UserStore,
    user_id: i64,
    now: DateTime<Utc>,
) -> StoreResult<RenewOutcome> {
    let current = store.subscription_end_date(user_id)?;
    match extend(current, now) {
        ExtendOutcome::Extended(new_end) => {
            // a missing user also reads as "never subscribed", so the update
            // count is the only signal that nothing was persisted
            if !store.set_subscription_end_date(user_id, new_end)? {
                return Err(StoreError::InvalidArgument(format!(
                    "no user with id {user_id}"
                )));
            }
            Ok(RenewOutcome::Renewed(new_end))
        }
        ExtendOutcome::Refused => Ok(RenewOutcome::StillActive),
    }
}
