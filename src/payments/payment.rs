use serde::{Deserialize, Serialize};

/// A payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payment {
    /// Payment identifier.
    pub id: i64,
    /// Amount in minor units.
    pub amount: i64,
}

impl Payment {
    /// Creates a payment of `amount` minor units.
    pub fn new(id: i64, amount: i64) -> Self {
        Self { id, amount }
    }
}
