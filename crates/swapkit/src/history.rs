//! Per-account bridge transfer history.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::{account_key, Storage};

pub const HISTORY_NAMESPACE: &str = "swapkit.history";

/// Oldest entries beyond this are dropped on insert.
pub const MAX_HISTORY_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Success,
    Failed,
    /// Source leg confirmed but the destination needs manual action.
    NeedsGas,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: String,
    pub source_chain_id: String,
    pub destination_chain_id: String,
    pub token_symbol: String,
    pub amount: String,
    pub tx_hash: String,
    pub status: TransferStatus,
    pub created_at_epoch_seconds: u64,
}

pub struct TransferHistory {
    storage: Arc<dyn Storage>,
}

impl TransferHistory {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Records for `account`, most recent first. Unreadable data reads as empty.
    pub fn list(&self, account: &str) -> Vec<TransferRecord> {
        let key = account_key(HISTORY_NAMESPACE, account);
        match self.storage.get(&key) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("discarding corrupt transfer history: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("failed to read transfer history: {}", e);
                Vec::new()
            }
        }
    }

    /// Add a record. An existing record with the same id is replaced.
    pub fn record(&self, account: &str, record: TransferRecord) -> Result<(), StorageError> {
        let mut records = self.list(account);
        records.retain(|r| r.id != record.id);
        records.insert(0, record);
        records.truncate(MAX_HISTORY_ENTRIES);
        self.save(account, &records)
    }

    /// Returns `false` if no record has this id.
    pub fn update_status(
        &self,
        account: &str,
        id: &str,
        status: TransferStatus,
    ) -> Result<bool, StorageError> {
        let mut records = self.list(account);
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        record.status = status;
        self.save(account, &records)?;
        Ok(true)
    }

    pub fn clear(&self, account: &str) -> Result<(), StorageError> {
        self.storage.remove(&account_key(HISTORY_NAMESPACE, account))
    }

    fn save(&self, account: &str, records: &[TransferRecord]) -> Result<(), StorageError> {
        let json = serde_json::to_string(records)?;
        self.storage
            .set(&account_key(HISTORY_NAMESPACE, account), &json)
    }
}
