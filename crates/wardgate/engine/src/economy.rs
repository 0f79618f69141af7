//! Economy client: one balance/withdraw/deposit contract over two possible
//! backing ledgers.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use wardgate_types::ActorId;

/// A backing ledger. All operations are asynchronous; an unavailable service
/// is represented by the absence of a backend, not by errors here.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Current balance; zero for unknown accounts.
    async fn balance(&self, actor: &ActorId) -> Decimal;

    /// Withdraw `amount`; false when the account cannot cover it or the
    /// operation fails.
    async fn withdraw(&self, actor: &ActorId, amount: Decimal) -> bool;

    /// Deposit `amount`; false when the operation fails.
    async fn deposit(&self, actor: &ActorId, amount: Decimal) -> bool;
}

/// Normalizes a preferred ledger plus a fallback into one client.
///
/// The preferred backend is consulted first and blocks overdraw by checking
/// the balance before withdrawing; the fallback is used as-is. With neither
/// configured, every transaction uniformly fails and every balance reads zero
/// — unavailability is never a silent pass.
#[derive(Clone, Default)]
pub struct EconomyBridge {
    preferred: Option<Arc<dyn LedgerBackend>>,
    fallback: Option<Arc<dyn LedgerBackend>>,
}

impl EconomyBridge {
    /// Bridge over an optional preferred backend and an optional fallback.
    pub fn new(
        preferred: Option<Arc<dyn LedgerBackend>>,
        fallback: Option<Arc<dyn LedgerBackend>>,
    ) -> Self {
        Self {
            preferred,
            fallback,
        }
    }

    /// A bridge with no backend at all.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Whether any backend is configured.
    pub fn is_available(&self) -> bool {
        self.preferred.is_some() || self.fallback.is_some()
    }

    /// Current balance, zero when no backend is available.
    pub async fn balance(&self, actor: &ActorId) -> Decimal {
        if let Some(preferred) = &self.preferred {
            return preferred.balance(actor).await;
        }
        if let Some(fallback) = &self.fallback {
            return fallback.balance(actor).await;
        }
        Decimal::ZERO
    }

    /// Withdraw `amount`. Amounts of zero or less trivially succeed.
    pub async fn withdraw(&self, actor: &ActorId, amount: Decimal) -> bool {
        if amount <= Decimal::ZERO {
            return true;
        }
        if let Some(preferred) = &self.preferred {
            if preferred.balance(actor).await < amount {
                debug!(actor = %actor, %amount, "withdraw blocked, insufficient funds");
                return false;
            }
            return preferred.withdraw(actor, amount).await;
        }
        if let Some(fallback) = &self.fallback {
            return fallback.withdraw(actor, amount).await;
        }
        false
    }

    /// Deposit `amount`; false when no backend is available.
    pub async fn deposit(&self, actor: &ActorId, amount: Decimal) -> bool {
        if let Some(preferred) = &self.preferred {
            return preferred.deposit(actor, amount).await;
        }
        if let Some(fallback) = &self.fallback {
            return fallback.deposit(actor, amount).await;
        }
        false
    }
}

/// In-process ledger keyed by actor. Serves as the reference backend and as
/// the test double for the bridge contract.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: DashMap<ActorId, Decimal>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account directly, creating it if needed.
    pub fn credit(&self, actor: &ActorId, amount: Decimal) {
        *self.accounts.entry(*actor).or_insert(Decimal::ZERO) += amount;
    }

    /// Read an account balance without going through the async contract.
    pub fn balance_of(&self, actor: &ActorId) -> Decimal {
        self.accounts
            .get(actor)
            .map(|b| *b)
            .unwrap_or(Decimal::ZERO)
    }
}

#[async_trait]
impl LedgerBackend for InMemoryLedger {
    async fn balance(&self, actor: &ActorId) -> Decimal {
        self.balance_of(actor)
    }

    async fn withdraw(&self, actor: &ActorId, amount: Decimal) -> bool {
        let mut entry = self.accounts.entry(*actor).or_insert(Decimal::ZERO);
        if *entry < amount {
            return false;
        }
        *entry -= amount;
        true
    }

    async fn deposit(&self, actor: &ActorId, amount: Decimal) -> bool {
        *self.accounts.entry(*actor).or_insert(Decimal::ZERO) += amount;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge_over(ledger: Arc<InMemoryLedger>) -> EconomyBridge {
        EconomyBridge::new(Some(ledger as Arc<dyn LedgerBackend>), None)
    }

    #[tokio::test]
    async fn unavailable_bridge_fails_uniformly() {
        let bridge = EconomyBridge::unavailable();
        let actor = ActorId::random();

        assert!(!bridge.is_available());
        assert_eq!(bridge.balance(&actor).await, Decimal::ZERO);
        assert!(!bridge.withdraw(&actor, Decimal::from(5)).await);
        assert!(!bridge.deposit(&actor, Decimal::from(5)).await);
    }

    #[tokio::test]
    async fn zero_withdraw_trivially_succeeds() {
        let bridge = EconomyBridge::unavailable();
        assert!(bridge.withdraw(&ActorId::random(), Decimal::ZERO).await);
    }

    #[tokio::test]
    async fn preferred_blocks_overdraw() {
        let ledger = Arc::new(InMemoryLedger::new());
        let actor = ActorId::random();
        ledger.credit(&actor, Decimal::from(3));

        let bridge = bridge_over(ledger.clone());
        assert!(!bridge.withdraw(&actor, Decimal::from(5)).await);
        assert_eq!(ledger.balance_of(&actor), Decimal::from(3));
    }

    #[tokio::test]
    async fn withdraw_and_deposit_round_trip() {
        let ledger = Arc::new(InMemoryLedger::new());
        let actor = ActorId::random();
        ledger.credit(&actor, Decimal::from(20));

        let bridge = bridge_over(ledger.clone());
        assert!(bridge.withdraw(&actor, Decimal::from(5)).await);
        assert_eq!(ledger.balance_of(&actor), Decimal::from(15));
        assert!(bridge.deposit(&actor, Decimal::from(5)).await);
        assert_eq!(ledger.balance_of(&actor), Decimal::from(20));
    }

    #[tokio::test]
    async fn fallback_is_used_without_preferred() {
        let ledger = Arc::new(InMemoryLedger::new());
        let actor = ActorId::random();
        ledger.credit(&actor, Decimal::from(10));

        let bridge = EconomyBridge::new(None, Some(ledger.clone() as Arc<dyn LedgerBackend>));
        assert!(bridge.is_available());
        assert_eq!(bridge.balance(&actor).await, Decimal::from(10));
        assert!(bridge.withdraw(&actor, Decimal::from(4)).await);
        assert_eq!(ledger.balance_of(&actor), Decimal::from(6));
    }
}
