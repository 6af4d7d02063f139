//! Wallet ledger.
//!
//! A per-profile stored-value balance plus an append-only transaction log,
//! newest first. The balance never goes negative: a debit beyond the balance
//! fails with [`WalletError::InsufficientFunds`]. The pricing engine caps the
//! wallet discount at `min(balance, amount owed)`, so that failure path is
//! unreachable in normal operation but stays implemented defensively.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ids,
    store::{KeyValueStore, StoreError, keys},
};

/// Signup bonus credited when a wallet is opened, in minor units.
pub const SIGNUP_BONUS: i64 = 5_000;

/// Reward points granted at signup.
pub const SIGNUP_REWARD_POINTS: i64 = 10;

/// Total spend (minor units) required for the Gold tier.
pub const GOLD_THRESHOLD: i64 = 500_000;

/// Total spend (minor units) required for the Platinum tier.
pub const PLATINUM_THRESHOLD: i64 = 1_000_000;

/// Errors related to wallet mutation.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Credit and debit amounts must be positive.
    #[error("transaction amount must be positive, got {0}")]
    InvalidAmount(i64),

    /// A debit would drive the balance negative.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// The debit that was requested, in minor units.
        requested: i64,

        /// The balance available, in minor units.
        available: i64,
    },

    /// The wallet could not be persisted; the mutation is not committed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Loyalty tier, derived from total spend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    /// Starting tier.
    #[default]
    Silver,

    /// Reached at 5000 units of total spend.
    Gold,

    /// Reached at 10000 units of total spend.
    Platinum,
}

impl Tier {
    /// The tier a given total spend earns.
    #[must_use]
    pub fn for_total_spent(total_spent: i64) -> Self {
        if total_spent >= PLATINUM_THRESHOLD {
            Tier::Platinum
        } else if total_spent >= GOLD_THRESHOLD {
            Tier::Gold
        } else {
            Tier::Silver
        }
    }
}

/// Whether a ledger entry adds to or takes from the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Top-up, bonus or refund.
    Credit,

    /// Order payment.
    Debit,
}

/// Per-profile stored-value account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
    profile_id: String,
    balance: i64,
    reward_points: i64,
    tier: Tier,
    total_spent: i64,
    created_at: Timestamp,
}

impl WalletAccount {
    /// Current balance in minor units, never negative.
    pub fn balance(&self) -> i64 {
        self.balance
    }

    /// Accumulated reward points. Points are not cash and never move the
    /// balance.
    pub fn reward_points(&self) -> i64 {
        self.reward_points
    }

    /// Current loyalty tier.
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Lifetime spend through the wallet, in minor units.
    pub fn total_spent(&self) -> i64 {
        self.total_spent
    }

    /// The owning profile id.
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }
}

/// Immutable ledger entry. `balance_after` is a snapshot taken when the
/// entry is appended and is never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    id: String,
    kind: TransactionKind,
    amount: i64,
    description: String,
    #[serde(default)]
    is_points: bool,
    timestamp: Timestamp,
    balance_after: i64,
}

impl WalletTransaction {
    /// Ledger entry id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Credit or debit.
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Amount moved, always positive. For point entries this is a point
    /// count, not cash.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether this entry moves reward points rather than cash.
    pub fn is_points(&self) -> bool {
        self.is_points
    }

    /// When the entry was appended.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Cash balance immediately after this entry applied.
    pub fn balance_after(&self) -> i64 {
        self.balance_after
    }
}

/// The wallet aggregate: account plus ledger, persisted together on every
/// mutation.
#[derive(Debug)]
pub struct Wallet {
    account: WalletAccount,
    transactions: Vec<WalletTransaction>,
}

impl Wallet {
    /// Open the wallet for a profile, creating it with the signup bonus on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns a [`WalletError`] if the backing storage cannot be read or
    /// the new account cannot be persisted.
    pub fn open<S: KeyValueStore>(store: &mut S, profile_id: &str) -> Result<Self, WalletError> {
        if let Some(account) = store.get_json::<WalletAccount>(&keys::wallet(profile_id))? {
            let transactions = store
                .get_json(&keys::wallet_transactions(profile_id))?
                .unwrap_or_default();

            return Ok(Self {
                account,
                transactions,
            });
        }

        let account = WalletAccount {
            profile_id: profile_id.to_owned(),
            balance: SIGNUP_BONUS,
            reward_points: SIGNUP_REWARD_POINTS,
            tier: Tier::Silver,
            total_spent: 0,
            created_at: Timestamp::now(),
        };

        let bonus = WalletTransaction {
            id: ids::timestamped("txn"),
            kind: TransactionKind::Credit,
            amount: SIGNUP_BONUS,
            description: "Welcome bonus for new members".to_owned(),
            is_points: false,
            timestamp: Timestamp::now(),
            balance_after: SIGNUP_BONUS,
        };

        let wallet = Self {
            account,
            transactions: vec![bonus],
        };
        wallet.persist(store)?;

        tracing::info!(profile_id, "wallet opened with signup bonus");

        Ok(wallet)
    }

    /// Current balance in minor units. Pure read.
    #[must_use]
    pub fn balance(&self) -> i64 {
        self.account.balance
    }

    /// The account record.
    #[must_use]
    pub fn account(&self) -> &WalletAccount {
        &self.account
    }

    /// The ledger, newest first. Repeatable, side-effect free.
    #[must_use]
    pub fn history(&self) -> &[WalletTransaction] {
        &self.transactions
    }

    /// Add funds to the balance and append a credit entry.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::InvalidAmount`] for a non-positive amount, or
    /// a store error if the mutation cannot be persisted (in which case the
    /// balance is unchanged).
    pub fn credit<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        amount: i64,
        description: &str,
    ) -> Result<WalletTransaction, WalletError> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        self.apply(store, TransactionKind::Credit, amount, description, |account| {
            account.balance += amount;
        })
    }

    /// Take funds from the balance and append a debit entry. Updates total
    /// spend and the loyalty tier.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::InvalidAmount`] for a non-positive amount,
    /// [`WalletError::InsufficientFunds`] if the debit would overdraw, or a
    /// store error if the mutation cannot be persisted (in which case the
    /// balance is unchanged).
    pub fn debit<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        amount: i64,
        description: &str,
    ) -> Result<WalletTransaction, WalletError> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        if amount > self.account.balance {
            return Err(WalletError::InsufficientFunds {
                requested: amount,
                available: self.account.balance,
            });
        }

        self.apply(store, TransactionKind::Debit, amount, description, |account| {
            account.balance -= amount;
            account.total_spent += amount;
            account.tier = Tier::for_total_spent(account.total_spent);
        })
    }

    /// Give a debited amount back, reversing everything the debit did:
    /// the balance comes back, `total_spent` comes down and the tier is
    /// recomputed.
    ///
    /// Compensation step for the checkout rollback path only; a plain
    /// [`Wallet::credit`] is a top-up, not a reversal.
    pub(crate) fn refund<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        amount: i64,
        description: &str,
    ) -> Result<WalletTransaction, WalletError> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        self.apply(store, TransactionKind::Credit, amount, description, |account| {
            account.balance += amount;
            account.total_spent = (account.total_spent - amount).max(0);
            account.tier = Tier::for_total_spent(account.total_spent);
        })
    }

    /// Grant reward points with a points-flagged credit entry. Points never
    /// move the cash balance; the entry snapshots the cash balance as-is.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::InvalidAmount`] for a non-positive point
    /// count, or a store error if the mutation cannot be persisted.
    pub fn award_points<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        points: i64,
        reason: &str,
    ) -> Result<WalletTransaction, WalletError> {
        if points <= 0 {
            return Err(WalletError::InvalidAmount(points));
        }

        let previous = self.account.clone();
        self.account.reward_points += points;

        let entry = WalletTransaction {
            id: ids::timestamped("txn"),
            kind: TransactionKind::Credit,
            amount: points,
            description: reason.to_owned(),
            is_points: true,
            timestamp: Timestamp::now(),
            balance_after: self.account.balance,
        };

        self.commit(store, previous, entry)
    }

    /// Apply a cash mutation, append its ledger entry and persist both, in
    /// one synchronous step.
    fn apply<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        kind: TransactionKind,
        amount: i64,
        description: &str,
        mutate: impl FnOnce(&mut WalletAccount),
    ) -> Result<WalletTransaction, WalletError> {
        let previous = self.account.clone();

        mutate(&mut self.account);

        let entry = WalletTransaction {
            id: ids::timestamped("txn"),
            kind,
            amount,
            description: description.to_owned(),
            is_points: false,
            timestamp: Timestamp::now(),
            balance_after: self.account.balance,
        };

        tracing::debug!(
            profile_id = %self.account.profile_id,
            ?kind,
            amount,
            balance_after = self.account.balance,
            "wallet mutation"
        );

        self.commit(store, previous, entry)
    }

    /// Prepend the entry, persist, and roll the in-memory state back if the
    /// write does not commit.
    fn commit<S: KeyValueStore>(
        &mut self,
        store: &mut S,
        previous: WalletAccount,
        entry: WalletTransaction,
    ) -> Result<WalletTransaction, WalletError> {
        self.transactions.insert(0, entry.clone());

        if let Err(err) = self.persist(store) {
            self.transactions.remove(0);
            self.account = previous;
            return Err(err);
        }

        Ok(entry)
    }

    /// Write ledger first, account second: a failed ledger write leaves
    /// both keys untouched, and a failed account write puts the previous
    /// ledger value back, so the two keys never disagree.
    fn persist<S: KeyValueStore>(&self, store: &mut S) -> Result<(), WalletError> {
        let account_key = keys::wallet(&self.account.profile_id);
        let ledger_key = keys::wallet_transactions(&self.account.profile_id);

        let previous_ledger = store.get(&ledger_key)?;

        store.set_json(&ledger_key, &self.transactions)?;

        if let Err(err) = store.set_json(&account_key, &self.account) {
            let restore = match &previous_ledger {
                Some(raw) => store.set(&ledger_key, raw),
                None => store.remove(&ledger_key),
            };

            if let Err(restore_err) = restore {
                tracing::error!(
                    profile_id = %self.account.profile_id,
                    %restore_err,
                    "could not restore the ledger after a failed account write"
                );
            }

            return Err(err.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::store::MemoryStore;

    use super::*;

    #[test]
    fn open_grants_the_signup_bonus_once() -> TestResult {
        let mut store = MemoryStore::new();

        let wallet = Wallet::open(&mut store, "u1")?;
        assert_eq!(wallet.balance(), SIGNUP_BONUS);
        assert_eq!(wallet.account().reward_points(), SIGNUP_REWARD_POINTS);
        assert_eq!(wallet.history().len(), 1);

        let reopened = Wallet::open(&mut store, "u1")?;
        assert_eq!(reopened.balance(), SIGNUP_BONUS, "bonus must not repeat");
        assert_eq!(reopened.history().len(), 1);

        Ok(())
    }

    #[test]
    fn credit_and_debit_keep_balance_after_consistent() -> TestResult {
        let mut store = MemoryStore::new();
        let mut wallet = Wallet::open(&mut store, "u1")?;

        wallet.credit(&mut store, 20_000, "Money added to wallet")?;
        wallet.debit(&mut store, 7_000, "Payment for order ord_1")?;

        // Newest first: debit, credit, signup bonus.
        let history = wallet.history();
        assert_eq!(history.len(), 3);

        let mut running = 0_i64;
        for entry in history.iter().rev() {
            match entry.kind() {
                TransactionKind::Credit if !entry.is_points() => running += entry.amount(),
                TransactionKind::Debit => running -= entry.amount(),
                TransactionKind::Credit => {}
            }
            assert_eq!(
                entry.balance_after(),
                running,
                "balance_after must replay in sequence"
            );
        }

        assert_eq!(wallet.balance(), running);

        Ok(())
    }

    #[test]
    fn debit_beyond_balance_fails_without_effect() -> TestResult {
        let mut store = MemoryStore::new();
        let mut wallet = Wallet::open(&mut store, "u1")?;
        let before = wallet.balance();

        let result = wallet.debit(&mut store, before + 1, "overdraw attempt");

        assert!(
            matches!(result, Err(WalletError::InsufficientFunds { .. })),
            "overdraw must be rejected"
        );
        assert_eq!(wallet.balance(), before);
        assert_eq!(wallet.history().len(), 1, "no entry for a rejected debit");

        Ok(())
    }

    #[test]
    fn non_positive_amounts_are_rejected() -> TestResult {
        let mut store = MemoryStore::new();
        let mut wallet = Wallet::open(&mut store, "u1")?;

        assert!(matches!(
            wallet.credit(&mut store, 0, "zero"),
            Err(WalletError::InvalidAmount(0))
        ));
        assert!(matches!(
            wallet.debit(&mut store, -100, "negative"),
            Err(WalletError::InvalidAmount(-100))
        ));

        Ok(())
    }

    #[test]
    fn tier_ladder_follows_total_spend() -> TestResult {
        let mut store = MemoryStore::new();
        let mut wallet = Wallet::open(&mut store, "u1")?;

        wallet.credit(&mut store, 2_000_000, "top up")?;
        assert_eq!(wallet.account().tier(), Tier::Silver);

        wallet.debit(&mut store, GOLD_THRESHOLD, "Payment for order ord_1")?;
        assert_eq!(wallet.account().tier(), Tier::Gold);

        wallet.debit(&mut store, PLATINUM_THRESHOLD - GOLD_THRESHOLD, "Payment for order ord_2")?;
        assert_eq!(wallet.account().tier(), Tier::Platinum);

        Ok(())
    }

    #[test]
    fn points_never_move_the_cash_balance() -> TestResult {
        let mut store = MemoryStore::new();
        let mut wallet = Wallet::open(&mut store, "u1")?;
        let cash = wallet.balance();

        let entry = wallet.award_points(&mut store, 25, "Order reward")?;

        assert!(entry.is_points());
        assert_eq!(entry.balance_after(), cash);
        assert_eq!(wallet.balance(), cash);
        assert_eq!(
            wallet.account().reward_points(),
            SIGNUP_REWARD_POINTS + 25
        );

        Ok(())
    }

    #[test]
    fn refund_reverses_the_spend_accounting() -> TestResult {
        let mut store = MemoryStore::new();
        let mut wallet = Wallet::open(&mut store, "u1")?;

        wallet.credit(&mut store, 700_000, "top up")?;
        wallet.debit(&mut store, GOLD_THRESHOLD + 100_000, "Payment for order ord_1")?;
        assert_eq!(wallet.account().tier(), Tier::Gold);

        wallet.refund(&mut store, GOLD_THRESHOLD + 100_000, "Refund for failed order ord_1")?;

        assert_eq!(wallet.balance(), SIGNUP_BONUS + 700_000);
        assert_eq!(wallet.account().total_spent(), 0, "refund must undo the spend");
        assert_eq!(wallet.account().tier(), Tier::Silver, "tier must drop back");

        Ok(())
    }

    #[test]
    fn failed_write_rolls_the_mutation_back() -> TestResult {
        let mut store = MemoryStore::new();
        let mut wallet = Wallet::open(&mut store, "u1")?;
        let before = wallet.balance();

        store.fail_writes_to(keys::wallet("u1"));

        assert!(
            wallet.credit(&mut store, 10_000, "top up").is_err(),
            "credit should fail"
        );
        assert_eq!(wallet.balance(), before);
        assert_eq!(wallet.history().len(), 1);

        Ok(())
    }

    #[test]
    fn failed_ledger_write_leaves_the_stored_account_alone() -> TestResult {
        let mut store = MemoryStore::new();
        let mut wallet = Wallet::open(&mut store, "u1")?;

        store.fail_writes_to(keys::wallet_transactions("u1"));

        assert!(
            wallet.credit(&mut store, 10_000, "top up").is_err(),
            "credit should fail"
        );

        store.allow_writes_to(&keys::wallet_transactions("u1"));

        let reloaded = Wallet::open(&mut store, "u1")?;
        assert_eq!(reloaded.balance(), SIGNUP_BONUS, "stored balance must not move");
        assert_eq!(reloaded.history().len(), 1);

        Ok(())
    }

    #[test]
    fn failed_account_write_restores_the_stored_ledger() -> TestResult {
        let mut store = MemoryStore::new();
        let mut wallet = Wallet::open(&mut store, "u1")?;

        store.fail_writes_to(keys::wallet("u1"));

        assert!(
            wallet.credit(&mut store, 10_000, "top up").is_err(),
            "credit should fail"
        );

        store.allow_writes_to(&keys::wallet("u1"));

        // The stored ledger must agree with the stored account again: one
        // entry, snapshotting the signup bonus.
        let reloaded = Wallet::open(&mut store, "u1")?;
        assert_eq!(reloaded.balance(), SIGNUP_BONUS);
        assert_eq!(reloaded.history().len(), 1, "failed entry must not persist");
        assert_eq!(
            reloaded.history().first().map(WalletTransaction::balance_after),
            Some(SIGNUP_BONUS)
        );

        Ok(())
    }

    #[test]
    fn ledger_survives_a_reload() -> TestResult {
        let mut store = MemoryStore::new();

        {
            let mut wallet = Wallet::open(&mut store, "u1")?;
            wallet.credit(&mut store, 10_000, "top up")?;
        }

        let wallet = Wallet::open(&mut store, "u1")?;
        assert_eq!(wallet.balance(), SIGNUP_BONUS + 10_000);
        assert_eq!(wallet.history().len(), 2);
        assert_eq!(
            wallet.history().first().map(WalletTransaction::description),
            Some("top up"),
            "history is newest first"
        );

        Ok(())
    }
}
