//! Address collaborator
//!
//! Orders only need `find_one`; address CRUD lives elsewhere. The stored
//! implementation reads the `addresses` table, which the API fills through
//! a single registration endpoint.

use async_trait::async_trait;
use shared::Address;

use crate::error::{Entity, ServiceError, ServiceResult};
use crate::storage::CommerceStorage;

#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Resolve an address, `NotFound` when the id is unknown
    async fn find_one(&self, address_id: &str) -> ServiceResult<Address>;
}

/// Address book backed by the document store
#[derive(Clone)]
pub struct StoredAddressBook {
    storage: CommerceStorage,
}

impl StoredAddressBook {
    pub fn new(storage: CommerceStorage) -> Self {
        Self { storage }
    }

    /// Insert or replace an address record
    pub fn register(&self, address: &Address) -> ServiceResult<()> {
        if address.street.trim().is_empty() || address.city.trim().is_empty() {
            return Err(ServiceError::validation("street and city are required"));
        }
        self.storage.put_address(address)?;
        Ok(())
    }
}

#[async_trait]
impl AddressBook for StoredAddressBook {
    async fn find_one(&self, address_id: &str) -> ServiceResult<Address> {
        self.storage
            .get_address(address_id)?
            .ok_or_else(|| ServiceError::not_found(Entity::Address, address_id))
    }
}
