//! Shipping address record.

use common::{AddressId, UserId};
use serde::{Deserialize, Serialize};

/// A saved shipping address.
///
/// Orders embed a full copy of the chosen address, so later edits to the
/// address book never change where a placed order was shipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub barangay: Option<String>,
    pub city: String,
    pub province: String,
    pub zip_code: String,
}
