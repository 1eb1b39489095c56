//! Typed records returned by the indexing service.
//!
//! Invariants are checked while deserializing, so a value of any of these
//! types is always valid. A violation surfaces as a decode error.

use std::collections::HashMap;
use std::ops::Add;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Address = String;
pub type TransactionHash = String;

/// Constraint violations on decoded records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("timestamp must be in milliseconds (13 digits), got {0}")]
    TimestampNotMillis(u64),

    #[error("fee cannot be negative, got {0}")]
    NegativeFee(Decimal),

    #[error("input must specify an address or a transaction pointer")]
    InputWithoutSource,
}

/// Arithmetic errors on [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amounts have different currencies: {left} != {right}")]
    CurrencyMismatch { left: String, right: String },
}

// ─── Amount ──────────────────────────────────────────────────────────────────

/// A value in a given currency.
///
/// Equality compares value and currency together. Only `Amount == Amount`
/// is defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    pub currency_symbol: String,
}

impl Amount {
    pub fn new(value: Decimal, currency_symbol: impl Into<String>) -> Self {
        Self {
            value,
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Add two amounts of the same currency.
    pub fn checked_add(&self, other: &Amount) -> Result<Amount, AmountError> {
        if self.currency_symbol != other.currency_symbol {
            return Err(AmountError::CurrencyMismatch {
                left: self.currency_symbol.clone(),
                right: other.currency_symbol.clone(),
            });
        }
        Ok(Amount {
            value: self.value + other.value,
            currency_symbol: self.currency_symbol.clone(),
        })
    }
}

impl Add for Amount {
    type Output = Result<Amount, AmountError>;

    fn add(self, rhs: Amount) -> Self::Output {
        self.checked_add(&rhs)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Result<Amount, AmountError>;

    fn add(self, rhs: &'a Amount) -> Self::Output {
        self.checked_add(rhs)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.currency_symbol)
    }
}

// ─── Block ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawBlock {
    height: u64,
    hash: String,
    timestamp_ms: u64,
    #[serde(default)]
    transactions: Vec<TransactionHash>,
}

/// A mined block and the hashes of the transactions it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBlock")]
pub struct Block {
    height: u64,
    hash: String,
    timestamp_ms: u64,
    transactions: Vec<TransactionHash>,
}

impl Block {
    pub fn new(
        height: u64,
        hash: impl Into<String>,
        timestamp_ms: u64,
        transactions: Vec<TransactionHash>,
    ) -> Result<Self, ValidationError> {
        if !(1_000_000_000_000..=9_999_999_999_999).contains(&timestamp_ms) {
            return Err(ValidationError::TimestampNotMillis(timestamp_ms));
        }
        Ok(Self {
            height,
            hash: hash.into(),
            timestamp_ms,
            transactions,
        })
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Block time as a UTC timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_ms as i64).unwrap_or_default()
    }

    /// Transaction hashes in block order.
    pub fn transactions(&self) -> &[TransactionHash] {
        &self.transactions
    }
}

impl TryFrom<RawBlock> for Block {
    type Error = ValidationError;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        Block::new(raw.height, raw.hash, raw.timestamp_ms, raw.transactions)
    }
}

// ─── Transaction ─────────────────────────────────────────────────────────────

/// Reference to an output of an earlier transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionPointer {
    pub transaction_hash: TransactionHash,
    pub output_index: u32,
}

#[derive(Deserialize)]
struct RawInput {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    amount: Option<Amount>,
    #[serde(default)]
    transaction_pointer: Option<TransactionPointer>,
}

/// A transaction input. Carries an address, a transaction pointer, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInput")]
pub struct Input {
    address: Option<Address>,
    amount: Option<Amount>,
    transaction_pointer: Option<TransactionPointer>,
}

impl Input {
    pub fn new(
        address: Option<Address>,
        amount: Option<Amount>,
        transaction_pointer: Option<TransactionPointer>,
    ) -> Result<Self, ValidationError> {
        if address.is_none() && transaction_pointer.is_none() {
            return Err(ValidationError::InputWithoutSource);
        }
        Ok(Self {
            address,
            amount,
            transaction_pointer,
        })
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn amount(&self) -> Option<&Amount> {
        self.amount.as_ref()
    }

    pub fn transaction_pointer(&self) -> Option<&TransactionPointer> {
        self.transaction_pointer.as_ref()
    }
}

impl TryFrom<RawInput> for Input {
    type Error = ValidationError;

    fn try_from(raw: RawInput) -> Result<Self, Self::Error> {
        Input::new(raw.address, raw.amount, raw.transaction_pointer)
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub address: Address,
    pub amount: Amount,
}

#[derive(Deserialize)]
struct RawTransaction {
    hash: TransactionHash,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    fee: Amount,
}

/// A transaction with its inputs, outputs and non-negative fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTransaction")]
pub struct Transaction {
    hash: TransactionHash,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    fee: Amount,
}

impl Transaction {
    pub fn new(
        hash: impl Into<TransactionHash>,
        inputs: Vec<Input>,
        outputs: Vec<Output>,
        fee: Amount,
    ) -> Result<Self, ValidationError> {
        if fee.value.is_sign_negative() && !fee.value.is_zero() {
            return Err(ValidationError::NegativeFee(fee.value));
        }
        Ok(Self {
            hash: hash.into(),
            inputs,
            outputs,
            fee,
        })
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn fee(&self) -> &Amount {
        &self.fee
    }
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = ValidationError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        Transaction::new(raw.hash, raw.inputs, raw.outputs, raw.fee)
    }
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub name: String,
}

/// Token standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "ERC20")]
    Erc20,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Erc20 => write!(f, "ERC20"),
        }
    }
}

/// Token metadata: raw on-chain values are multiplied by `scaling`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub currency: Currency,
    pub scaling: Decimal,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// `contract address -> token` for one blockchain.
pub type TokenTable = HashMap<Address, Token>;

// ─── Tests ───────────────────────────────────────────────────────────────────
