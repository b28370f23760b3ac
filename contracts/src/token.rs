//! # Token Ledger
//!
//! Balances, allowances, and total supply for one fungible token.
//!
//! The whole supply is minted once, at creation, to a single holder. From
//! then on the ledger only changes through five operations:
//!
//! | Operation       | Moves                           | Emits                          |
//! |-----------------|---------------------------------|--------------------------------|
//! | `transfer`      | caller → to                     | `Transfer(caller, to, v)`      |
//! | `approve`       | nothing (sets an allowance)     | `Approval(caller, spender, v)` |
//! | `transfer_from` | from → to, spends allowance     | `Transfer(from, to, v)`        |
//! | `burn`          | caller → destroyed              | `Transfer(caller, 0x0, v)`     |
//! | `burn_from`     | from → destroyed, spends allow. | `Transfer(from, 0x0, v)`       |
//!
//! ## Invariants
//!
//! - `total_supply` is exactly the sum of all balances.
//! - The zero address never holds a balance.
//! - Every operation either applies completely or returns an error and
//!   changes nothing. Each one computes all of its writes before making any.
//!
//! ## Allowance Policy
//!
//! An allowance of [`UNLIMITED_ALLOWANCE`] (`u128::MAX`) is unlimited:
//! spending against it leaves it untouched. Any smaller allowance is
//! decremented by exactly the amount spent.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use corgi_protocol::config::{self, DECIMALS, UNLIMITED_ALLOWANCE};
use corgi_protocol::units::{amount_string, Amount};
use corgi_protocol::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{EventLog, EventRecord, LedgerEvent};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by ledger operations. A returned error always means the
/// ledger is unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The debit exceeds the account's balance.
    #[error("insufficient balance: {account} has {balance}, needs {required}")]
    InsufficientBalance {
        /// Account being debited.
        account: Address,
        /// Its current balance.
        balance: Amount,
        /// Amount the operation tried to debit.
        required: Amount,
    },

    /// The delegated spend exceeds the remaining allowance.
    #[error("insufficient allowance: {spender} may move {allowance} of {owner}'s tokens, needs {required}")]
    InsufficientAllowance {
        /// Account whose tokens are being spent.
        owner: Address,
        /// Account doing the spending.
        spender: Address,
        /// Remaining allowance.
        allowance: Amount,
        /// Amount the operation tried to spend.
        required: Amount,
    },

    /// The recipient is the zero address.
    #[error("invalid recipient: the zero address cannot receive tokens")]
    InvalidRecipient,

    /// The account being debited is the zero address.
    #[error("invalid sender: the zero address cannot send tokens")]
    InvalidSender,

    /// The zero address tried to grant an allowance.
    #[error("invalid approver: the zero address cannot approve spenders")]
    InvalidApprover,

    /// An allowance was granted to the zero address.
    #[error("invalid spender: allowances cannot be granted to the zero address")]
    InvalidSpender,

    /// A credit would push a balance past `u128::MAX`.
    #[error("arithmetic overflow: crediting {credit} to {account} (balance {balance})")]
    ArithmeticOverflow {
        /// Account being credited.
        account: Address,
        /// Its current balance.
        balance: Amount,
        /// Amount that overflowed.
        credit: Amount,
    },

    /// A snapshot or live ledger failed its consistency check.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl TokenError {
    /// Short stable label, used for metrics and RPC error data.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::InsufficientBalance { .. } => "insufficient_balance",
            TokenError::InsufficientAllowance { .. } => "insufficient_allowance",
            TokenError::InvalidRecipient => "invalid_recipient",
            TokenError::InvalidSender => "invalid_sender",
            TokenError::InvalidApprover => "invalid_approver",
            TokenError::InvalidSpender => "invalid_spender",
            TokenError::ArithmeticOverflow { .. } => "arithmetic_overflow",
            TokenError::InvariantViolation(_) => "invariant_violation",
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Immutable token metadata plus the current supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Human-readable name, e.g. "CorgiCoin".
    pub name: String,
    /// Ticker symbol, e.g. "CORGI".
    pub symbol: String,
    /// Fractional decimal digits. Always 18.
    pub decimals: u8,
    /// Account recorded as owner at creation.
    pub owner: Address,
    /// Current total supply in smallest units.
    #[serde(with = "amount_string")]
    pub total_supply: Amount,
    /// When the ledger was created.
    pub created_at: DateTime<Utc>,
}

/// A mutating ledger call, as a value.
///
/// Hosts that receive calls over the wire decode them into this and hand
/// them to [`Ledger::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Transfer {
        caller: Address,
        to: Address,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    Approve {
        caller: Address,
        spender: Address,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    TransferFrom {
        caller: Address,
        from: Address,
        to: Address,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    Burn {
        caller: Address,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    BurnFrom {
        caller: Address,
        from: Address,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
}

impl Operation {
    /// Operation name, used as a log field and metrics label.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Transfer { .. } => "transfer",
            Operation::Approve { .. } => "approve",
            Operation::TransferFrom { .. } => "transfer_from",
            Operation::Burn { .. } => "burn",
            Operation::BurnFrom { .. } => "burn_from",
        }
    }

    /// The account that submitted the call.
    pub fn caller(&self) -> Address {
        match self {
            Operation::Transfer { caller, .. }
            | Operation::Approve { caller, .. }
            | Operation::TransferFrom { caller, .. }
            | Operation::Burn { caller, .. }
            | Operation::BurnFrom { caller, .. } => *caller,
        }
    }
}

/// A balance write computed during validation and applied afterwards.
#[derive(Debug, Clone, Copy)]
struct BalanceWrite {
    account: Address,
    balance: Amount,
}

/// A planned allowance change. `None` means the allowance is unlimited and
/// stays as it is.
type AllowanceWrite = Option<Amount>;

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The token ledger.
///
/// Zero balances and zero allowances are stored as absent entries, so
/// `balances.len()` is the number of holders.
#[derive(Debug, Clone)]
pub struct Ledger {
    name: String,
    symbol: String,
    owner: Address,
    total_supply: Amount,
    created_at: DateTime<Utc>,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    events: EventLog,
}

impl Ledger {
    /// Creates a ledger and credits the entire `initial_supply` to
    /// `initial_holder`, who is also recorded as owner.
    ///
    /// Emits `Transfer(0x0, initial_holder, initial_supply)`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidRecipient`] if `initial_holder` is the
    /// zero address.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        initial_supply: Amount,
        initial_holder: Address,
    ) -> Result<Self, TokenError> {
        if initial_holder.is_zero() {
            return Err(TokenError::InvalidRecipient);
        }

        let mut ledger = Self {
            name: name.into(),
            symbol: symbol.into(),
            owner: initial_holder,
            total_supply: 0,
            created_at: Utc::now(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            events: EventLog::new(),
        };

        ledger.write_balance(initial_holder, initial_supply);
        ledger.total_supply = initial_supply;
        ledger.events.emit(LedgerEvent::Transfer {
            from: Address::ZERO,
            to: initial_holder,
            value: initial_supply,
        });

        tracing::info!(
            name = %ledger.name,
            symbol = %ledger.symbol,
            owner = %initial_holder,
            supply = %initial_supply,
            "ledger created"
        );

        Ok(ledger)
    }

    /// Creates the standard CorgiCoin ledger: 100 billion CORGI minted to
    /// `deployer`.
    pub fn deploy(deployer: Address) -> Result<Self, TokenError> {
        Self::new(
            config::TOKEN_NAME,
            config::TOKEN_SYMBOL,
            config::INITIAL_SUPPLY,
            deployer,
        )
    }

    // -- Queries ------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Always 18.
    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Returns the account recorded at creation.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Returns the balance of `account`, or 0 if it has none.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Returns how much `spender` may still move out of `owner`'s balance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn metadata(&self) -> TokenMetadata {
        TokenMetadata {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: DECIMALS,
            owner: self.owner,
            total_supply: self.total_supply,
            created_at: self.created_at,
        }
    }

    /// Accounts with a nonzero balance, sorted by address.
    pub fn holders(&self) -> Vec<(Address, Amount)> {
        let mut holders: Vec<_> = self.balances.iter().map(|(a, b)| (*a, *b)).collect();
        holders.sort_unstable_by_key(|(a, _)| *a);
        holders
    }

    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    // -- Events -------------------------------------------------------------

    /// Events emitted since the last [`drain_events`](Self::drain_events).
    pub fn events(&self) -> &[EventRecord] {
        self.events.pending()
    }

    /// Takes all pending events.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        self.events.drain()
    }

    // -- Operations ---------------------------------------------------------

    /// Moves `amount` from `caller` to `to`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidSender`] if `caller` is the zero address.
    /// - [`TokenError::InvalidRecipient`] if `to` is the zero address.
    /// - [`TokenError::InsufficientBalance`] if `caller` holds less than `amount`.
    /// - [`TokenError::ArithmeticOverflow`] if crediting `to` would overflow.
    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let writes = self
            .plan_move(caller, to, amount)
            .map_err(|e| rejected("transfer", e))?;

        self.apply_balances(&writes);
        self.events.emit(LedgerEvent::Transfer {
            from: caller,
            to,
            value: amount,
        });
        tracing::debug!(from = %caller, to = %to, amount = %amount, "transfer applied");
        Ok(())
    }

    /// Sets `spender`'s allowance over `caller`'s balance to exactly
    /// `amount`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidApprover`] if `caller` is the zero address.
    /// - [`TokenError::InvalidSpender`] if `spender` is the zero address.
    pub fn approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if caller.is_zero() {
            return Err(rejected("approve", TokenError::InvalidApprover));
        }
        if spender.is_zero() {
            return Err(rejected("approve", TokenError::InvalidSpender));
        }

        self.write_allowance(caller, spender, amount);
        self.events.emit(LedgerEvent::Approval {
            owner: caller,
            spender,
            value: amount,
        });
        tracing::debug!(owner = %caller, spender = %spender, amount = %amount, "approval set");
        Ok(())
    }

    /// Moves `amount` from `from` to `to` on behalf of `caller`, spending
    /// `caller`'s allowance over `from`.
    ///
    /// Checks run in order: allowance, then sender and recipient, then
    /// balance. No allowance is spent unless the move succeeds.
    ///
    /// # Errors
    ///
    /// [`TokenError::InsufficientAllowance`], plus everything
    /// [`transfer`](Self::transfer) can return.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let spend = self
            .plan_spend(from, caller, amount)
            .map_err(|e| rejected("transfer_from", e))?;
        let writes = self
            .plan_move(from, to, amount)
            .map_err(|e| rejected("transfer_from", e))?;

        self.apply_spend(from, caller, spend);
        self.apply_balances(&writes);
        self.events.emit(LedgerEvent::Transfer {
            from,
            to,
            value: amount,
        });
        tracing::debug!(spender = %caller, from = %from, to = %to, amount = %amount, "transfer_from applied");
        Ok(())
    }

    /// Destroys `amount` of `caller`'s tokens, reducing total supply.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidSender`] if `caller` is the zero address.
    /// - [`TokenError::InsufficientBalance`] if `caller` holds less than `amount`.
    pub fn burn(&mut self, caller: Address, amount: Amount) -> Result<(), TokenError> {
        let write = self
            .plan_burn(caller, amount)
            .map_err(|e| rejected("burn", e))?;

        self.apply_burn(write, amount);
        tracing::debug!(from = %caller, amount = %amount, "burn applied");
        Ok(())
    }

    /// Destroys `amount` of `from`'s tokens on behalf of `caller`, spending
    /// `caller`'s allowance over `from`.
    pub fn burn_from(
        &mut self,
        caller: Address,
        from: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let spend = self
            .plan_spend(from, caller, amount)
            .map_err(|e| rejected("burn_from", e))?;
        let write = self
            .plan_burn(from, amount)
            .map_err(|e| rejected("burn_from", e))?;

        self.apply_spend(from, caller, spend);
        self.apply_burn(write, amount);
        tracing::debug!(spender = %caller, from = %from, amount = %amount, "burn_from applied");
        Ok(())
    }

    /// Dispatches an [`Operation`].
    pub fn execute(&mut self, op: &Operation) -> Result<(), TokenError> {
        match *op {
            Operation::Transfer { caller, to, amount } => self.transfer(caller, to, amount),
            Operation::Approve {
                caller,
                spender,
                amount,
            } => self.approve(caller, spender, amount),
            Operation::TransferFrom {
                caller,
                from,
                to,
                amount,
            } => self.transfer_from(caller, from, to, amount),
            Operation::Burn { caller, amount } => self.burn(caller, amount),
            Operation::BurnFrom {
                caller,
                from,
                amount,
            } => self.burn_from(caller, from, amount),
        }
    }

    // -- Consistency --------------------------------------------------------

    /// Verifies that balances sum to total supply and the zero address
    /// holds nothing.
    pub fn check_invariants(&self) -> Result<(), TokenError> {
        if self.balances.contains_key(&Address::ZERO) {
            return Err(TokenError::InvariantViolation(
                "zero address holds a balance".into(),
            ));
        }
        if self.balances.values().any(|b| *b == 0) {
            return Err(TokenError::InvariantViolation(
                "zero balance stored as an entry".into(),
            ));
        }

        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
            .ok_or_else(|| TokenError::InvariantViolation("balances overflow u128".into()))?;
        if sum != self.total_supply {
            return Err(TokenError::InvariantViolation(format!(
                "balances sum to {} but total supply is {}",
                sum, self.total_supply
            )));
        }
        Ok(())
    }

    /// Captures the ledger state. Pending events are not included.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let balances = self
            .balances
            .iter()
            .map(|(a, b)| (*a, AmountString(*b)))
            .collect();

        let mut allowances: BTreeMap<Address, BTreeMap<Address, AmountString>> = BTreeMap::new();
        for ((owner, spender), value) in &self.allowances {
            allowances
                .entry(*owner)
                .or_default()
                .insert(*spender, AmountString(*value));
        }

        LedgerSnapshot {
            metadata: self.metadata(),
            balances,
            allowances,
            events_emitted: self.events.emitted(),
        }
    }

    /// Rebuilds a ledger from a snapshot, rejecting any snapshot that
    /// breaks the supply or zero-address invariants.
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self, TokenError> {
        let LedgerSnapshot {
            metadata,
            balances,
            allowances,
            events_emitted,
        } = snapshot;

        if metadata.decimals != DECIMALS {
            return Err(TokenError::InvariantViolation(format!(
                "snapshot decimals {} != {}",
                metadata.decimals, DECIMALS
            )));
        }

        let mut ledger = Self {
            name: metadata.name,
            symbol: metadata.symbol,
            owner: metadata.owner,
            total_supply: metadata.total_supply,
            created_at: metadata.created_at,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            events: EventLog::starting_at(events_emitted),
        };

        for (account, AmountString(balance)) in balances {
            ledger.write_balance(account, balance);
        }
        for (owner, spenders) in allowances {
            for (spender, AmountString(value)) in spenders {
                if owner.is_zero() || spender.is_zero() {
                    return Err(TokenError::InvariantViolation(
                        "allowance involving the zero address".into(),
                    ));
                }
                ledger.write_allowance(owner, spender, value);
            }
        }
        ledger.check_invariants()?;
        Ok(ledger)
    }

    // -- Internals ----------------------------------------------------------

    fn plan_move(
        &self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<Vec<BalanceWrite>, TokenError> {
        if from.is_zero() {
            return Err(TokenError::InvalidSender);
        }
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient);
        }

        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: from,
                balance: from_balance,
                required: amount,
            });
        }

        // Self-transfer: the balance check above is the whole operation.
        if from == to {
            return Ok(Vec::new());
        }

        let to_balance = self.balance_of(&to);
        let new_to = to_balance
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow {
                account: to,
                balance: to_balance,
                credit: amount,
            })?;

        Ok(vec![
            BalanceWrite {
                account: from,
                balance: from_balance - amount,
            },
            BalanceWrite {
                account: to,
                balance: new_to,
            },
        ])
    }

    fn plan_spend(
        &self,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<AllowanceWrite, TokenError> {
        let current = self.allowance(&owner, &spender);
        if current == UNLIMITED_ALLOWANCE {
            return Ok(None);
        }
        if current < amount {
            return Err(TokenError::InsufficientAllowance {
                owner,
                spender,
                allowance: current,
                required: amount,
            });
        }
        Ok(Some(current - amount))
    }

    fn plan_burn(&self, from: Address, amount: Amount) -> Result<BalanceWrite, TokenError> {
        if from.is_zero() {
            return Err(TokenError::InvalidSender);
        }
        let balance = self.balance_of(&from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: from,
                balance,
                required: amount,
            });
        }
        Ok(BalanceWrite {
            account: from,
            balance: balance - amount,
        })
    }

    fn apply_balances(&mut self, writes: &[BalanceWrite]) {
        for w in writes {
            self.write_balance(w.account, w.balance);
        }
    }

    fn apply_spend(&mut self, owner: Address, spender: Address, spend: AllowanceWrite) {
        if let Some(remaining) = spend {
            self.write_allowance(owner, spender, remaining);
        }
    }

    fn apply_burn(&mut self, write: BalanceWrite, amount: Amount) {
        self.write_balance(write.account, write.balance);
        // Cannot underflow: the burned balance is part of the supply.
        self.total_supply = self.total_supply.saturating_sub(amount);
        self.events.emit(LedgerEvent::Transfer {
            from: write.account,
            to: Address::ZERO,
            value: amount,
        });
    }

    fn write_balance(&mut self, account: Address, balance: Amount) {
        if balance == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }

    fn write_allowance(&mut self, owner: Address, spender: Address, value: Amount) {
        if value == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), value);
        }
    }
}

fn rejected(op: &'static str, err: TokenError) -> TokenError {
    tracing::debug!(op, kind = err.kind(), error = %err, "operation rejected");
    err
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Amount wrapper that serializes as a decimal string, for use as a map value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmountString(#[serde(with = "amount_string")] pub Amount);

/// Serializable image of a ledger's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub metadata: TokenMetadata,
    pub balances: BTreeMap<Address, AmountString>,
    /// `owner -> spender -> remaining`.
    pub allowances: BTreeMap<Address, BTreeMap<Address, AmountString>>,
    /// Sequence number the next event will receive.
    pub events_emitted: u64,
}
