//! Billing months and the installment amortizer.
//!
//! A purchase contributes at most one fragment to a given statement:
//! cash purchases land whole in their own calendar month, installment
//! purchases are amortized over a contiguous window of months starting
//! at the purchase month. The final slice absorbs the rounding
//! remainder so the slices always sum to the purchase total exactly.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fatura_shared::types::round2;

/// Label used for non-installment purchase fragments.
pub const CASH_LABEL: &str = "Cash purchase";

/// Errors from constructing billing periods.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BillingError {
    /// Statement years before 2000 are rejected.
    #[error("year must be 2000 or later, got {0}")]
    YearOutOfRange(i32),

    /// Calendar months are 1-12.
    #[error("month must be between 1 and 12, got {0}")]
    MonthOutOfRange(u32),
}

/// A calendar (year, month) pair identifying one billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingMonth {
    year: i32,
    month: u32,
}

impl BillingMonth {
    /// Builds a validated statement period (year 2000+, month 1-12).
    ///
    /// # Errors
    ///
    /// Returns `BillingError` if year or month is out of range.
    pub fn statement_period(year: i32, month: u32) -> Result<Self, BillingError> {
        if year < 2000 {
            return Err(BillingError::YearOutOfRange(year));
        }
        if !(1..=12).contains(&month) {
            return Err(BillingError::MonthOutOfRange(month));
        }
        Ok(Self { year, month })
    }

    /// Returns the billing month containing the given date.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// The calendar month (1-12).
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// Signed number of months from `self` to `other`.
    ///
    /// Purchase in 2025-01 and target 2025-03 gives 2.
    #[must_use]
    pub fn months_until(self, other: Self) -> i64 {
        (i64::from(other.year) - i64::from(self.year)) * 12 + i64::from(other.month)
            - i64::from(self.month)
    }
}

impl std::fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One purchase fragment destined for a statement item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Human-readable label, e.g. `"Installment 3/6"`.
    pub label: String,
    /// Fragment amount, 2 decimal places.
    pub amount: Decimal,
}

/// The purchase fields the amortizer needs.
#[derive(Debug, Clone)]
pub struct PurchaseTerms {
    /// Calendar date of the purchase.
    pub purchase_date: NaiveDate,
    /// Full purchase amount.
    pub total_amount: Decimal,
    /// Whether the purchase is paid in installments.
    pub is_installment: bool,
    /// Number of installments (None for cash purchases).
    pub installments_total: Option<i32>,
}

/// Computes the installment slice of a purchase falling in `target`, if any.
///
/// The per-installment base is `round2(total / n)`; the final slice is
/// `round2(total - base * (n - 1))` so the window sums to the exact total.
/// Outside the window (or for `installments_total < 1`, which the purchase
/// invariant should already preclude) no fragment is produced.
#[must_use]
pub fn amortize(
    total_amount: Decimal,
    installments_total: i32,
    purchase_month: BillingMonth,
    target: BillingMonth,
) -> Option<Fragment> {
    if installments_total < 1 {
        return None;
    }

    let index = purchase_month.months_until(target);
    if index < 0 || index >= i64::from(installments_total) {
        return None;
    }

    let parts = Decimal::from(installments_total);
    let base = round2(total_amount / parts);
    let amount = if index == i64::from(installments_total) - 1 {
        round2(total_amount - base * (parts - Decimal::ONE))
    } else {
        base
    };

    Some(Fragment {
        label: format!("Installment {}/{installments_total}", index + 1),
        amount,
    })
}

/// Computes the cash fragment of a purchase: the full amount, if and only
/// if the purchase month equals the target month.
#[must_use]
pub fn cash_fragment(
    total_amount: Decimal,
    purchase_month: BillingMonth,
    target: BillingMonth,
) -> Option<Fragment> {
    (purchase_month == target).then(|| Fragment {
        label: CASH_LABEL.to_string(),
        amount: total_amount,
    })
}

/// Computes the fragment a purchase contributes to `target`, if any.
#[must_use]
pub fn fragment_for(terms: &PurchaseTerms, target: BillingMonth) -> Option<Fragment> {
    let purchase_month = BillingMonth::containing(terms.purchase_date);
    if terms.is_installment {
        amortize(
            terms.total_amount,
            terms.installments_total.unwrap_or(0),
            purchase_month,
            target,
        )
    } else {
        cash_fragment(terms.total_amount, purchase_month, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn bm(year: i32, month: u32) -> BillingMonth {
        BillingMonth::statement_period(year, month).unwrap()
    }

    #[test]
    fn test_statement_period_bounds() {
        assert!(BillingMonth::statement_period(2000, 1).is_ok());
        assert_eq!(
            BillingMonth::statement_period(1999, 12),
            Err(BillingError::YearOutOfRange(1999))
        );
        assert_eq!(
            BillingMonth::statement_period(2025, 0),
            Err(BillingError::MonthOutOfRange(0))
        );
        assert_eq!(
            BillingMonth::statement_period(2025, 13),
            Err(BillingError::MonthOutOfRange(13))
        );
    }

    #[rstest]
    #[case(2025, 1, 2025, 3, 2)]
    #[case(2025, 3, 2025, 1, -2)]
    #[case(2024, 11, 2025, 2, 3)]
    #[case(2025, 6, 2025, 6, 0)]
    fn test_months_until(
        #[case] from_y: i32,
        #[case] from_m: u32,
        #[case] to_y: i32,
        #[case] to_m: u32,
        #[case] expected: i64,
    ) {
        assert_eq!(bm(from_y, from_m).months_until(bm(to_y, to_m)), expected);
    }

    #[test]
    fn test_amortize_exact_division() {
        // 1200.00 over 6: purchased 2025-01, target 2025-03 is slice 3
        let fragment = amortize(dec!(1200.00), 6, bm(2025, 1), bm(2025, 3)).unwrap();
        assert_eq!(fragment.label, "Installment 3/6");
        assert_eq!(fragment.amount, dec!(200.00));
    }

    #[test]
    fn test_amortize_outside_window() {
        // index 7 >= 6 installments
        assert!(amortize(dec!(1200.00), 6, bm(2025, 1), bm(2025, 8)).is_none());
        // target before the purchase month
        assert!(amortize(dec!(1200.00), 6, bm(2025, 1), bm(2024, 12)).is_none());
    }

    #[test]
    fn test_amortize_last_slice_absorbs_remainder() {
        // 100.00 over 3: 33.33, 33.33, 33.34
        let first = amortize(dec!(100.00), 3, bm(2025, 1), bm(2025, 1)).unwrap();
        let second = amortize(dec!(100.00), 3, bm(2025, 1), bm(2025, 2)).unwrap();
        let last = amortize(dec!(100.00), 3, bm(2025, 1), bm(2025, 3)).unwrap();

        assert_eq!(first.amount, dec!(33.33));
        assert_eq!(second.amount, dec!(33.33));
        assert_eq!(last.amount, dec!(33.34));
        assert_eq!(last.label, "Installment 3/3");
        assert_eq!(first.amount + second.amount + last.amount, dec!(100.00));
    }

    #[test]
    fn test_amortize_single_installment() {
        let only = amortize(dec!(59.99), 1, bm(2025, 5), bm(2025, 5)).unwrap();
        assert_eq!(only.label, "Installment 1/1");
        assert_eq!(only.amount, dec!(59.99));
        assert!(amortize(dec!(59.99), 1, bm(2025, 5), bm(2025, 6)).is_none());
    }

    #[test]
    fn test_amortize_rejects_nonpositive_parts() {
        assert!(amortize(dec!(100.00), 0, bm(2025, 1), bm(2025, 1)).is_none());
        assert!(amortize(dec!(100.00), -3, bm(2025, 1), bm(2025, 1)).is_none());
    }

    #[test]
    fn test_cash_fragment_same_month_only() {
        let fragment = cash_fragment(dec!(350.40), bm(2025, 8), bm(2025, 8)).unwrap();
        assert_eq!(fragment.label, CASH_LABEL);
        assert_eq!(fragment.amount, dec!(350.40));

        assert!(cash_fragment(dec!(350.40), bm(2025, 8), bm(2025, 9)).is_none());
        assert!(cash_fragment(dec!(350.40), bm(2025, 8), bm(2025, 7)).is_none());
    }

    #[test]
    fn test_fragment_for_dispatch() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

        let installment = PurchaseTerms {
            purchase_date: date,
            total_amount: dec!(1200.00),
            is_installment: true,
            installments_total: Some(6),
        };
        let fragment = fragment_for(&installment, bm(2025, 3)).unwrap();
        assert_eq!(fragment.label, "Installment 3/6");

        let cash = PurchaseTerms {
            purchase_date: date,
            total_amount: dec!(42.00),
            is_installment: false,
            installments_total: None,
        };
        assert_eq!(fragment_for(&cash, bm(2025, 1)).unwrap().label, CASH_LABEL);
        assert!(fragment_for(&cash, bm(2025, 2)).is_none());
    }

    proptest! {
        /// Slices over the full window always sum to the exact total,
        /// regardless of how unevenly the amount divides.
        #[test]
        fn prop_slices_sum_to_total(cents in 1i64..=5_000_000, parts in 1i32..=48) {
            let total = Decimal::new(cents, 2);
            let start = bm(2020, 1);

            let mut sum = Decimal::ZERO;
            for offset in 0..parts {
                let month = 1 + u32::try_from(offset).unwrap();
                let target = BillingMonth {
                    year: 2020 + i32::try_from((month - 1) / 12).unwrap(),
                    month: (month - 1) % 12 + 1,
                };
                let fragment = amortize(total, parts, start, target).unwrap();
                sum += fragment.amount;
            }

            prop_assert_eq!(sum, total);
        }

        /// All slices but the last equal the rounded base amount.
        #[test]
        fn prop_non_final_slices_equal_base(cents in 1i64..=5_000_000, parts in 2i32..=24) {
            let total = Decimal::new(cents, 2);
            let start = bm(2020, 1);
            let base = round2(total / Decimal::from(parts));

            for offset in 0..parts - 1 {
                let month = 1 + u32::try_from(offset).unwrap();
                let target = BillingMonth {
                    year: 2020 + i32::try_from((month - 1) / 12).unwrap(),
                    month: (month - 1) % 12 + 1,
                };
                let fragment = amortize(total, parts, start, target).unwrap();
                prop_assert_eq!(fragment.amount, base);
            }
        }
    }
}
