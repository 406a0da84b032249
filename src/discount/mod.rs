//! Discount State
//!
//! Holds the applied voucher and its derived discount, and keeps a best-effort
//! copy in a [`StateStore`] so the selection survives a reload. The persisted
//! copy only seeds the UI; the server re-validates at submit time.

use std::sync::Arc;

use jiff::Timestamp;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    money::{Amount, amount, zero},
    vouchers::{Evaluation, Voucher, VoucherError, VoucherKind, evaluate},
};

pub mod store;

pub use store::{FileStore, MemoryStore, StateStore, StoreError};

/// Storage key of the JSON-serialized applied voucher.
pub const APPLIED_VOUCHER_KEY: &str = "applied_voucher";

/// Storage key of the stringified discount amount.
pub const VOUCHER_DISCOUNT_KEY: &str = "voucher_discount";

/// A voucher together with its latest evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedVoucher {
    /// The voucher definition.
    pub voucher: Voucher,

    /// Evaluation against the most recent subtotal.
    pub evaluation: Evaluation,
}

/// Owner of the applied-voucher state.
#[derive(Debug)]
pub struct DiscountState {
    applied: Option<AppliedVoucher>,
    store: Arc<dyn StateStore>,
}

impl DiscountState {
    /// Create an empty state backed by `store`. Nothing is read from the store.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            applied: None,
            store,
        }
    }

    /// Rebuild state from the store.
    ///
    /// Corrupt or partially written entries are cleared rather than trusted.
    #[must_use]
    pub fn restore(store: Arc<dyn StateStore>) -> Self {
        let mut state = Self::new(store);

        match state.read_persisted() {
            Ok(Some(applied)) => {
                debug!(code = %applied.voucher.code, "restored applied voucher");
                state.applied = Some(applied);
            }
            Ok(None) => {}
            Err(reason) => {
                warn!(%reason, "discarding persisted voucher state");
                state.clear_persisted();
            }
        }

        state
    }

    /// Evaluate `voucher` against `subtotal`, store the result and persist it.
    ///
    /// An ineligible voucher is stored with a zero discount; callers surface
    /// the reason before applying.
    ///
    /// # Errors
    ///
    /// Returns a [`VoucherError`] if the voucher's amounts cannot be represented.
    pub fn apply(
        &mut self,
        voucher: Voucher,
        subtotal: &Amount,
        point_in_time: Timestamp,
    ) -> Result<Amount, VoucherError> {
        let evaluation = evaluate(Some(&voucher), subtotal, point_in_time)?;

        self.applied = Some(AppliedVoucher {
            voucher,
            evaluation,
        });
        self.persist();

        Ok(evaluation.discount)
    }

    /// Drop the applied voucher and clear storage.
    pub fn remove(&mut self) {
        self.applied = None;
        self.clear_persisted();
    }

    /// Re-evaluate the applied voucher against a new subtotal.
    ///
    /// Returns `None` when no voucher is applied.
    ///
    /// # Errors
    ///
    /// Returns a [`VoucherError`] if the voucher's amounts cannot be represented.
    pub fn recompute(
        &mut self,
        subtotal: &Amount,
        point_in_time: Timestamp,
    ) -> Result<Option<Evaluation>, VoucherError> {
        let Some(applied) = self.applied.as_mut() else {
            return Ok(None);
        };

        let evaluation = evaluate(Some(&applied.voucher), subtotal, point_in_time)?;

        if evaluation != applied.evaluation {
            debug!(
                code = %applied.voucher.code,
                discount = evaluation.discount.to_minor_units(),
                eligible = evaluation.is_eligible(),
                "voucher discount recomputed"
            );
        }

        applied.evaluation = evaluation;
        self.persist();

        Ok(Some(evaluation))
    }

    /// The applied voucher, if any.
    pub fn voucher(&self) -> Option<&Voucher> {
        self.applied.as_ref().map(|applied| &applied.voucher)
    }

    /// The applied voucher with its evaluation.
    pub fn applied(&self) -> Option<&AppliedVoucher> {
        self.applied.as_ref()
    }

    /// The latest evaluation, if a voucher is applied.
    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.applied.as_ref().map(|applied| &applied.evaluation)
    }

    /// The current discount; zero without a voucher.
    pub fn discount(&self) -> Amount {
        self.evaluation().map_or_else(zero, |evaluation| evaluation.discount)
    }

    /// Whether the applied voucher waives shipping.
    pub fn is_free_shipping(&self) -> bool {
        self.evaluation().is_some_and(|evaluation| evaluation.free_shipping)
    }

    fn persist(&self) {
        let Some(applied) = &self.applied else {
            return;
        };

        let voucher = match serde_json::to_string(&applied.voucher) {
            Ok(voucher) => voucher,
            Err(error) => {
                warn!(%error, "failed to serialize applied voucher");
                return;
            }
        };

        let discount = applied.evaluation.discount.to_minor_units().to_string();

        if let Err(error) = self
            .store
            .set(APPLIED_VOUCHER_KEY, &voucher)
            .and_then(|()| self.store.set(VOUCHER_DISCOUNT_KEY, &discount))
        {
            warn!(%error, "failed to persist applied voucher");
        }
    }

    fn clear_persisted(&self) {
        for key in [APPLIED_VOUCHER_KEY, VOUCHER_DISCOUNT_KEY] {
            if let Err(error) = self.store.remove(key) {
                warn!(%error, key, "failed to clear persisted voucher state");
            }
        }
    }

    fn read_persisted(&self) -> Result<Option<AppliedVoucher>, CorruptState> {
        let voucher = self.store.get(APPLIED_VOUCHER_KEY)?;
        let discount = self.store.get(VOUCHER_DISCOUNT_KEY)?;

        let (voucher, discount) = match (voucher, discount) {
            (None, None) => return Ok(None),
            (Some(voucher), Some(discount)) => (voucher, discount),
            _ => return Err(CorruptState::Partial),
        };

        let voucher: Voucher = serde_json::from_str(&voucher)?;

        voucher.validate()?;

        let discount = discount
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|discount| *discount >= 0)
            .ok_or(CorruptState::Discount(discount))?;

        let evaluation = Evaluation {
            discount: amount(discount),
            free_shipping: voucher.kind == VoucherKind::FreeShipping,
            ineligibility: None,
        };

        Ok(Some(AppliedVoucher {
            voucher,
            evaluation,
        }))
    }
}

/// Reasons persisted state is discarded on restore.
#[derive(Debug, Error)]
enum CorruptState {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("only one of voucher and discount was persisted")]
    Partial,

    #[error("persisted voucher is not valid json")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] VoucherError),

    #[error("persisted discount {0:?} is not a non-negative integer")]
    Discount(String),
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::vouchers::{Ineligibility, VoucherCode};

    use super::*;

    fn now() -> Result<Timestamp, jiff::Error> {
        "2026-10-19T12:00:00Z".parse()
    }

    fn ten_percent() -> Result<Voucher, crate::vouchers::VoucherCodeError> {
        Ok(Voucher::new(VoucherCode::parse("PET10")?, VoucherKind::Percentage, Decimal::TEN)
            .with_min_order(Decimal::from(100_000)))
    }

    #[test]
    fn apply_persists_both_keys() -> TestResult {
        let store = Arc::new(MemoryStore::new());
        let mut state = DiscountState::new(store.clone());

        let discount = state.apply(ten_percent()?, &amount(250_000), now()?)?;

        assert_eq!(discount, amount(25_000));
        assert_eq!(store.get(VOUCHER_DISCOUNT_KEY)?.as_deref(), Some("25000"));
        assert!(store.get(APPLIED_VOUCHER_KEY)?.is_some_and(|json| json.contains("PET10")));

        Ok(())
    }

    #[test]
    fn ineligible_apply_stores_zero_discount() -> TestResult {
        let mut state = DiscountState::new(Arc::new(MemoryStore::new()));

        let discount = state.apply(ten_percent()?, &amount(50_000), now()?)?;

        assert_eq!(discount, zero());
        assert!(state.voucher().is_some());
        assert!(state.evaluation().is_some_and(|e| !e.is_eligible()));
        assert!(state.applied().is_some_and(|applied| {
            applied.voucher.code.as_str() == "PET10"
                && matches!(
                    applied.evaluation.ineligibility,
                    Some(Ineligibility::BelowMinimumOrder { .. })
                )
        }));

        Ok(())
    }

    #[test]
    fn recompute_is_idempotent() -> TestResult {
        let mut state = DiscountState::new(Arc::new(MemoryStore::new()));

        state.apply(ten_percent()?, &amount(400_000), now()?)?;

        let first = state.recompute(&amount(180_000), now()?)?;
        let second = state.recompute(&amount(180_000), now()?)?;

        assert_eq!(first, second);
        assert_eq!(state.discount(), amount(18_000));

        Ok(())
    }

    #[test]
    fn recompute_below_minimum_zeroes_discount() -> TestResult {
        let mut state = DiscountState::new(Arc::new(MemoryStore::new()));

        state.apply(ten_percent()?, &amount(250_000), now()?)?;

        let evaluation = state.recompute(&amount(90_000), now()?)?;

        assert_eq!(state.discount(), zero());
        assert!(matches!(
            evaluation.and_then(|e| e.ineligibility),
            Some(Ineligibility::BelowMinimumOrder { .. })
        ));

        Ok(())
    }

    #[test]
    fn recompute_without_voucher_is_noop() -> TestResult {
        let mut state = DiscountState::new(Arc::new(MemoryStore::new()));

        assert_eq!(state.recompute(&amount(1_000), now()?)?, None);
        assert_eq!(state.discount(), zero());

        Ok(())
    }

    #[test]
    fn remove_clears_state_and_storage() -> TestResult {
        let store = Arc::new(MemoryStore::new());
        let mut state = DiscountState::new(store.clone());

        state.apply(ten_percent()?, &amount(250_000), now()?)?;
        state.remove();

        assert!(state.voucher().is_none());
        assert_eq!(state.recompute(&amount(500_000), now()?)?, None);
        assert_eq!(state.discount(), zero());
        assert_eq!(store.get(APPLIED_VOUCHER_KEY)?, None);
        assert_eq!(store.get(VOUCHER_DISCOUNT_KEY)?, None);

        Ok(())
    }

    #[test]
    fn restore_reads_persisted_state() -> TestResult {
        let store = Arc::new(MemoryStore::new());

        DiscountState::new(store.clone()).apply(ten_percent()?, &amount(250_000), now()?)?;

        let restored = DiscountState::restore(store);

        assert_eq!(restored.voucher().map(|v| v.code.as_str()), Some("PET10"));
        assert_eq!(restored.discount(), amount(25_000));

        Ok(())
    }

    #[test]
    fn restore_discards_unparseable_voucher() -> TestResult {
        let store = Arc::new(MemoryStore::new());

        store.set(APPLIED_VOUCHER_KEY, "{\"code\": ")?;
        store.set(VOUCHER_DISCOUNT_KEY, "25000")?;

        let restored = DiscountState::restore(store.clone());

        assert!(restored.voucher().is_none());
        assert_eq!(store.get(APPLIED_VOUCHER_KEY)?, None);
        assert_eq!(store.get(VOUCHER_DISCOUNT_KEY)?, None);

        Ok(())
    }

    #[test]
    fn restore_discards_partial_write() -> TestResult {
        let store = Arc::new(MemoryStore::new());

        store.set(APPLIED_VOUCHER_KEY, &serde_json::to_string(&ten_percent()?)?)?;

        let restored = DiscountState::restore(store.clone());

        assert!(restored.voucher().is_none());
        assert_eq!(store.get(APPLIED_VOUCHER_KEY)?, None);

        Ok(())
    }

    #[test]
    fn restore_discards_bad_discount() -> TestResult {
        let store = Arc::new(MemoryStore::new());

        store.set(APPLIED_VOUCHER_KEY, &serde_json::to_string(&ten_percent()?)?)?;
        store.set(VOUCHER_DISCOUNT_KEY, "-5")?;

        assert!(DiscountState::restore(store.clone()).voucher().is_none());

        store.set(APPLIED_VOUCHER_KEY, &serde_json::to_string(&ten_percent()?)?)?;
        store.set(VOUCHER_DISCOUNT_KEY, "NaN")?;

        assert!(DiscountState::restore(store).voucher().is_none());

        Ok(())
    }

    #[test]
    fn restore_discards_voucher_breaking_invariants() -> TestResult {
        let store = Arc::new(MemoryStore::new());

        store.set(
            APPLIED_VOUCHER_KEY,
            r#"{"code":"HUGE","type":"percentage","value":"250"}"#,
        )?;
        store.set(VOUCHER_DISCOUNT_KEY, "1000")?;

        assert!(DiscountState::restore(store).voucher().is_none());

        Ok(())
    }
}
