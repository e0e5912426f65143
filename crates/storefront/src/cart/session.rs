//! Who, if anyone, the cart belongs to.

use crate::models::CurrentUser;

/// Yields the signed-in user, if there is one.
///
/// The manager asks on every mutation, so swapping the answer (sign-in,
/// sign-out, token refresh) takes effect on the next call.
pub trait SessionProvider: Send + Sync {
    /// The current user, or `None` for an anonymous cart.
    fn current_user(&self) -> Option<&CurrentUser>;
}

impl SessionProvider for Option<CurrentUser> {
    fn current_user(&self) -> Option<&CurrentUser> {
        self.as_ref()
    }
}

/// A session that never has a user: the cart stays local-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl SessionProvider for Anonymous {
    fn current_user(&self) -> Option<&CurrentUser> {
        None
    }
}
