//! Sanitized block and transaction data visible to a contract
//!
//! The execution context is built once per execution from a
//! [`ContextOptions`] record and is read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{GammaVmError, Result};

/// Raw options supplied by the caller of an execution
///
/// Every field is optional at the deserialization layer so that a missing
/// field can be reported precisely; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// Index of the block the transaction is included in
    pub block_index: Option<u64>,
    /// Hash of that block (hex or any opaque encoding)
    pub block_hash: Option<String>,
    /// Nonce of that block
    pub block_nonce: Option<u64>,
    /// Identifier of the transaction triggering the execution
    pub transaction_id: Option<String>,
}

impl ContextOptions {
    /// Options with every field present
    pub fn new(
        block_index: u64,
        block_hash: impl Into<String>,
        block_nonce: u64,
        transaction_id: impl Into<String>,
    ) -> Self {
        Self {
            block_index: Some(block_index),
            block_hash: Some(block_hash.into()),
            block_nonce: Some(block_nonce),
            transaction_id: Some(transaction_id.into()),
        }
    }
}

/// Immutable view of block/transaction data for one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionContext {
    block_index: u64,
    block_hash: String,
    block_nonce: u64,
    transaction_id: String,
}

impl ExecutionContext {
    /// Build a context from caller options
    ///
    /// Fail-fast: the first missing or blank field is reported as
    /// [`GammaVmError::InvalidContext`]. Nothing is defaulted.
    pub fn from_options(options: &ContextOptions) -> Result<Self> {
        let block_index = options
            .block_index
            .ok_or_else(|| GammaVmError::invalid_context("block_index"))?;
        let block_hash = Self::required_text(&options.block_hash, "block_hash")?;
        let block_nonce = options
            .block_nonce
            .ok_or_else(|| GammaVmError::invalid_context("block_nonce"))?;
        let transaction_id = Self::required_text(&options.transaction_id, "transaction_id")?;

        Ok(Self {
            block_index,
            block_hash,
            block_nonce,
            transaction_id,
        })
    }

    /// Build a context from already validated values
    pub fn new(
        block_index: u64,
        block_hash: impl Into<String>,
        block_nonce: u64,
        transaction_id: impl Into<String>,
    ) -> Result<Self> {
        Self::from_options(&ContextOptions::new(
            block_index,
            block_hash,
            block_nonce,
            transaction_id,
        ))
    }

    fn required_text(value: &Option<String>, field: &str) -> Result<String> {
        match value {
            Some(text) if !text.trim().is_empty() => Ok(text.clone()),
            _ => Err(GammaVmError::invalid_context(field)),
        }
    }

    /// Block index
    pub fn block_index(&self) -> u64 {
        self.block_index
    }

    /// Block hash
    pub fn block_hash(&self) -> &str {
        &self.block_hash
    }

    /// Block nonce
    pub fn block_nonce(&self) -> u64 {
        self.block_nonce
    }

    /// Transaction identifier
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let options = ContextOptions::new(10, "abc", 42, "tx1");
        let context = ExecutionContext::from_options(&options).unwrap();

        assert_eq!(context.block_index(), 10);
        assert_eq!(context.block_hash(), "abc");
        assert_eq!(context.block_nonce(), 42);
        assert_eq!(context.transaction_id(), "tx1");
    }

    #[test]
    fn test_missing_fields_rejected_in_order() {
        let mut options = ContextOptions::default();
        assert_eq!(
            ExecutionContext::from_options(&options),
            Err(GammaVmError::invalid_context("block_index"))
        );

        options.block_index = Some(1);
        assert_eq!(
            ExecutionContext::from_options(&options),
            Err(GammaVmError::invalid_context("block_hash"))
        );

        options.block_hash = Some("00ff".into());
        assert_eq!(
            ExecutionContext::from_options(&options),
            Err(GammaVmError::invalid_context("block_nonce"))
        );

        options.block_nonce = Some(7);
        assert_eq!(
            ExecutionContext::from_options(&options),
            Err(GammaVmError::invalid_context("transaction_id"))
        );

        options.transaction_id = Some("tx".into());
        assert!(ExecutionContext::from_options(&options).is_ok());
    }

    #[test]
    fn test_blank_text_fields_rejected() {
        let options = ContextOptions::new(1, "   ", 1, "tx");
        assert_eq!(
            ExecutionContext::from_options(&options),
            Err(GammaVmError::invalid_context("block_hash"))
        );

        let options = ContextOptions::new(1, "ab", 1, "");
        assert_eq!(
            ExecutionContext::from_options(&options),
            Err(GammaVmError::invalid_context("transaction_id"))
        );
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{
            "block_index": 3,
            "block_hash": "beef",
            "block_nonce": 9,
            "transaction_id": "tx9",
            "miner": "someone"
        }"#;
        let options: ContextOptions = serde_json::from_str(json).unwrap();
        let context = ExecutionContext::from_options(&options).unwrap();
        assert_eq!(context.block_hash(), "beef");
    }

    #[test]
    fn test_new_validates() {
        assert!(ExecutionContext::new(0, "h", 0, "t").is_ok());
        assert!(ExecutionContext::new(0, "", 0, "t").is_err());
    }
}
