//! Shipping address record
//!
//! Addresses are owned by the address collaborator; orders only check
//! that a referenced id resolves.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub id: String,
    pub user_id: String,
    pub street: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Single-line form used for the shipping snapshot
    pub fn one_line(&self) -> String {
        match &self.state {
            Some(state) => format!(
                "{}, {}, {} {}, {}",
                self.street, self.city, state, self.postal_code, self.country
            ),
            None => format!(
                "{}, {} {}, {}",
                self.street, self.city, self.postal_code, self.country
            ),
        }
    }
}
