//! redb-based document store for orders and payments
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Order documents |
//! | `order_numbers` | `order_number` | `order_id` | Unique order number index |
//! | `payments` | `payment_id` | `Payment` (JSON) | Payment documents |
//! | `payment_intents` | `intent_id` | `payment_id` | Webhook lookup by gateway intent |
//! | `addresses` | `address_id` | `Address` (JSON) | Address collaborator records |
//!
//! # Atomicity
//!
//! Every document write is a single write transaction. Guarded updates read
//! and write the document inside the same transaction, so a status check
//! and the write it guards cannot interleave with another writer. Orders and
//! payments are never written in the same transaction.

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Address, Order, Payment};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;
type IndexTable = TableDefinition<'static, &'static str, &'static str>;

/// Table for orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: JsonTable = TableDefinition::new("orders");

/// Table for the order number index: key = order_number, value = order_id
const ORDER_NUMBERS_TABLE: IndexTable = TableDefinition::new("order_numbers");

/// Table for payments: key = payment_id, value = JSON-serialized Payment
const PAYMENTS_TABLE: JsonTable = TableDefinition::new("payments");

/// Table for the gateway intent index: key = intent_id, value = payment_id
const PAYMENT_INTENTS_TABLE: IndexTable = TableDefinition::new("payment_intents");

/// Table for addresses: key = address_id, value = JSON-serialized Address
const ADDRESSES_TABLE: JsonTable = TableDefinition::new("addresses");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Document store backed by redb
#[derive(Clone)]
pub struct CommerceStorage {
    db: Arc<Database>,
}

impl CommerceStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_NUMBERS_TABLE)?;
            let _ = write_txn.open_table(PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(PAYMENT_INTENTS_TABLE)?;
            let _ = write_txn.open_table(ADDRESSES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Order Operations ==========

    /// Insert a new order and claim its order number.
    ///
    /// Returns `false` without writing when the order number is taken.
    pub fn insert_order(&self, order: &Order) -> StorageResult<bool> {
        let txn = self.begin_write()?;
        let taken = {
            let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
            let taken = numbers.get(order.order_number.as_str())?.is_some();
            if !taken {
                numbers.insert(order.order_number.as_str(), order.id.as_str())?;
            }
            taken
        };
        if taken {
            txn.abort()?;
            return Ok(false);
        }
        store_json(&txn, ORDERS_TABLE, &order.id, order)?;
        txn.commit()?;
        Ok(true)
    }

    /// Get an order by ID
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        self.read_json(ORDERS_TABLE, order_id)
    }

    /// Get an order by its order number
    pub fn find_order_by_number(&self, order_number: &str) -> StorageResult<Option<Order>> {
        match self.read_index(ORDER_NUMBERS_TABLE, order_number)? {
            Some(order_id) => self.get_order(&order_id),
            None => Ok(None),
        }
    }

    /// Get all orders
    pub fn get_all_orders(&self) -> StorageResult<Vec<Order>> {
        self.read_all(ORDERS_TABLE)
    }

    /// Read, mutate and write an order inside one write transaction.
    ///
    /// `apply` returns whether the document changed; `false` skips the write.
    /// Returns `Ok(None)` when the order does not exist.
    pub fn update_order<E>(
        &self,
        order_id: &str,
        apply: impl FnOnce(&mut Order) -> Result<bool, E>,
    ) -> Result<Option<Order>, E>
    where
        E: From<StorageError>,
    {
        let txn = self.begin_write()?;
        let Some(mut order) = load_json::<Order>(&txn, ORDERS_TABLE, order_id)? else {
            txn.abort().map_err(StorageError::from)?;
            return Ok(None);
        };
        match apply(&mut order) {
            Ok(true) => {}
            Ok(false) => {
                txn.abort().map_err(StorageError::from)?;
                return Ok(Some(order));
            }
            Err(e) => {
                txn.abort().map_err(StorageError::from)?;
                return Err(e);
            }
        }
        store_json(&txn, ORDERS_TABLE, order_id, &order)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(Some(order))
    }

    // ========== Payment Operations ==========

    /// Insert a new payment and index its gateway intent
    pub fn insert_payment(&self, payment: &Payment) -> StorageResult<()> {
        let txn = self.begin_write()?;
        store_json(&txn, PAYMENTS_TABLE, &payment.id, payment)?;
        if let Some(intent_id) = &payment.payment_intent_id {
            index_intent(&txn, intent_id, &payment.id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Get a payment by ID
    pub fn get_payment(&self, payment_id: &str) -> StorageResult<Option<Payment>> {
        self.read_json(PAYMENTS_TABLE, payment_id)
    }

    /// Get the payment attached to a gateway intent
    pub fn find_payment_by_intent(&self, intent_id: &str) -> StorageResult<Option<Payment>> {
        match self.read_index(PAYMENT_INTENTS_TABLE, intent_id)? {
            Some(payment_id) => self.get_payment(&payment_id),
            None => Ok(None),
        }
    }

    /// Get all payments
    pub fn get_all_payments(&self) -> StorageResult<Vec<Payment>> {
        self.read_all(PAYMENTS_TABLE)
    }

    /// Read, mutate and write a payment inside one write transaction.
    ///
    /// Same contract as [`update_order`](Self::update_order). A changed
    /// `payment_intent_id` moves the intent index entry in the same transaction.
    pub fn update_payment<E>(
        &self,
        payment_id: &str,
        apply: impl FnOnce(&mut Payment) -> Result<bool, E>,
    ) -> Result<Option<Payment>, E>
    where
        E: From<StorageError>,
    {
        let txn = self.begin_write()?;
        let Some(mut payment) = load_json::<Payment>(&txn, PAYMENTS_TABLE, payment_id)? else {
            txn.abort().map_err(StorageError::from)?;
            return Ok(None);
        };
        let previous_intent = payment.payment_intent_id.clone();
        match apply(&mut payment) {
            Ok(true) => {}
            Ok(false) => {
                txn.abort().map_err(StorageError::from)?;
                return Ok(Some(payment));
            }
            Err(e) => {
                txn.abort().map_err(StorageError::from)?;
                return Err(e);
            }
        }
        store_json(&txn, PAYMENTS_TABLE, payment_id, &payment)?;
        if payment.payment_intent_id != previous_intent {
            if let Some(old) = &previous_intent {
                unindex_intent(&txn, old, payment_id)?;
            }
            if let Some(new) = &payment.payment_intent_id {
                index_intent(&txn, new, payment_id)?;
            }
        }
        txn.commit().map_err(StorageError::from)?;
        Ok(Some(payment))
    }

    /// Delete a payment and its intent index entry
    pub fn remove_payment(&self, payment_id: &str) -> StorageResult<bool> {
        let txn = self.begin_write()?;
        let Some(payment) = load_json::<Payment>(&txn, PAYMENTS_TABLE, payment_id)? else {
            txn.abort()?;
            return Ok(false);
        };
        {
            let mut table = txn.open_table(PAYMENTS_TABLE)?;
            table.remove(payment_id)?;
        }
        if let Some(intent_id) = &payment.payment_intent_id {
            unindex_intent(&txn, intent_id, payment_id)?;
        }
        txn.commit()?;
        Ok(true)
    }

    // ========== Address Operations ==========

    /// Insert or replace an address
    pub fn put_address(&self, address: &Address) -> StorageResult<()> {
        let txn = self.begin_write()?;
        store_json(&txn, ADDRESSES_TABLE, &address.id, address)?;
        txn.commit()?;
        Ok(())
    }

    /// Get an address by ID
    pub fn get_address(&self, address_id: &str) -> StorageResult<Option<Address>> {
        self.read_json(ADDRESSES_TABLE, address_id)
    }

    // ========== Read Helpers ==========

    fn read_json<T: DeserializeOwned>(&self, def: JsonTable, key: &str) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;

        let doc = match table.get(key)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(doc)
    }

    fn read_all<T: DeserializeOwned>(&self, def: JsonTable) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;

        let mut docs = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            docs.push(serde_json::from_slice(value.value())?);
        }
        Ok(docs)
    }

    fn read_index(&self, def: IndexTable, key: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;
        let target = table.get(key)?.map(|guard| guard.value().to_string());
        Ok(target)
    }
}

fn load_json<T: DeserializeOwned>(
    txn: &WriteTransaction,
    def: JsonTable,
    key: &str,
) -> StorageResult<Option<T>> {
    let table = txn.open_table(def)?;
    let doc = match table.get(key)? {
        Some(value) => Some(serde_json::from_slice(value.value())?),
        None => None,
    };
    Ok(doc)
}

fn store_json<T: Serialize>(
    txn: &WriteTransaction,
    def: JsonTable,
    key: &str,
    doc: &T,
) -> StorageResult<()> {
    let mut table = txn.open_table(def)?;
    let value = serde_json::to_vec(doc)?;
    table.insert(key, value.as_slice())?;
    Ok(())
}

fn index_intent(txn: &WriteTransaction, intent_id: &str, payment_id: &str) -> StorageResult<()> {
    let mut table = txn.open_table(PAYMENT_INTENTS_TABLE)?;
    table.insert(intent_id, payment_id)?;
    Ok(())
}

/// Remove an intent entry only if it still points at `payment_id`
fn unindex_intent(txn: &WriteTransaction, intent_id: &str, payment_id: &str) -> StorageResult<()> {
    let mut table = txn.open_table(PAYMENT_INTENTS_TABLE)?;
    let owned = table
        .get(intent_id)?
        .is_some_and(|guard| guard.value() == payment_id);
    if owned {
        table.remove(intent_id)?;
    }
    Ok(())
}
