//! Explicit request context threaded into every core operation.

use crate::types::UserId;

/// The caller's identity for one unit of work.
///
/// Authentication happens outside this system; handlers receive the
/// already-verified user id and admin flag and pass them down explicitly
/// rather than relying on ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl RequestContext {
    /// Context for a regular customer.
    pub fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// Context for an admin user.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_is_not_admin() {
        let ctx = RequestContext::customer(UserId::new());
        assert!(!ctx.is_admin);
    }

    #[test]
    fn admin_is_admin() {
        let ctx = RequestContext::admin(UserId::new());
        assert!(ctx.is_admin);
    }
}
