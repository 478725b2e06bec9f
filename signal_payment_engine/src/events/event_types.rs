use serde::Serialize;

use crate::db_types::{Payment, User};

/// Emitted whenever an approved gateway payment has been reconciled and the user's subscription extended. The
/// webhook dispatcher subscribes to this to fan the event out to registered endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentCompletedEvent {
    pub payment: Payment,
    pub user: User,
}

impl PaymentCompletedEvent {
    pub fn new(payment: Payment, user: User) -> Self {
        Self { payment, user }
    }
}
