//! Reference reconciliation
//!
//! Pure matching of extracted transactions against the organization's
//! payer-reference registry. No I/O, no mutation of the registry.

use std::collections::HashMap;

use uuid::Uuid;

use crate::types::*;

/// Result of partitioning one statement's transactions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciliation {
    pub allocated: Vec<AllocatedPayment>,
    pub unallocated: Vec<UnallocatedPayment>,
}

impl Reconciliation {
    pub fn total_transactions(&self) -> usize {
        self.allocated.len() + self.unallocated.len()
    }
}

/// Normalize a reference for matching: trim whitespace, lowercase.
/// Idempotent, so normalizing twice gives the same result.
pub fn normalize_reference(reference: &str) -> String {
    reference.trim().to_lowercase()
}

/// Matches transaction references against the payer-reference registry
pub struct ReferenceReconciler;

impl ReferenceReconciler {
    /// Partition transactions into allocated and unallocated payments.
    ///
    /// Both outputs preserve the relative order of the input, and every
    /// input transaction appears in exactly one of them. The registry is
    /// expected to be pre-filtered to the organization.
    pub fn reconcile(
        statement_id: i64,
        organization_id: i64,
        transactions: &[RawTransaction],
        registry: &[PayerReference],
    ) -> Reconciliation {
        let index = Self::reference_index(registry);
        let mut result = Reconciliation::default();

        for transaction in transactions {
            let normalized = normalize_reference(&transaction.reference);
            match index.get(normalized.as_str()) {
                Some(&payer_id) => result.allocated.push(AllocatedPayment {
                    organization_id,
                    statement_id,
                    payer_id,
                    amount: transaction.amount.clone(),
                    date: transaction.date,
                    transaction_reference: normalized,
                    reference_on_deposit: transaction.reference.clone(),
                }),
                None => result.unallocated.push(UnallocatedPayment {
                    organization_id,
                    statement_id,
                    amount: transaction.amount.clone(),
                    date: transaction.date,
                    transaction_reference: normalized,
                    is_allocated: false,
                }),
            }
        }

        result
    }

    /// Build the normalized-reference lookup map.
    ///
    /// The registry is supposed to hold one reference per payer per
    /// organization; that is not enforced here, and if two payers share a
    /// normalized reference the later entry wins. The behavior is pinned
    /// by a test so it does not change silently.
    fn reference_index(registry: &[PayerReference]) -> HashMap<String, Uuid> {
        registry
            .iter()
            .map(|entry| (normalize_reference(&entry.reference_details), entry.payer_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn transaction(reference: &str, amount: i64) -> RawTransaction {
        RawTransaction {
            date: NaiveDate::from_ymd_opt(2024, 9, 9).unwrap(),
            amount: BigDecimal::from(amount),
            reference: reference.to_string(),
        }
    }

    fn registry_entry(reference: &str, payer_id: Uuid) -> PayerReference {
        PayerReference {
            organization_id: 1,
            payer_id,
            reference_details: reference.to_string(),
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["  ABC123  ", "MiXeD Case", "already normal", ""] {
            let once = normalize_reference(raw);
            assert_eq!(normalize_reference(&once), once);
        }
    }

    #[test]
    fn matches_are_case_and_whitespace_insensitive() {
        let payer = Uuid::new_v4();
        let result = ReferenceReconciler::reconcile(
            7,
            1,
            &[transaction(" ABC123 ", 500)],
            &[registry_entry("abc123", payer)],
        );

        assert_eq!(result.allocated.len(), 1);
        assert!(result.unallocated.is_empty());

        let allocated = &result.allocated[0];
        assert_eq!(allocated.payer_id, payer);
        assert_eq!(allocated.transaction_reference, "abc123");
        assert_eq!(allocated.reference_on_deposit, " ABC123 ");
        assert_eq!(allocated.statement_id, 7);
    }

    #[test]
    fn partition_is_complete_and_order_preserving() {
        let payer = Uuid::new_v4();
        let transactions = vec![
            transaction("known", 1),
            transaction("unknown-a", 2),
            transaction("KNOWN", 3),
            transaction("unknown-b", 4),
        ];
        let result =
            ReferenceReconciler::reconcile(1, 1, &transactions, &[registry_entry("known", payer)]);

        assert_eq!(
            result.total_transactions(),
            transactions.len(),
            "no transaction may be dropped"
        );
        assert_eq!(result.allocated.len(), 2);
        assert!(result.allocated[0].amount < result.allocated[1].amount);
        assert_eq!(result.unallocated[0].transaction_reference, "unknown-a");
        assert_eq!(result.unallocated[1].transaction_reference, "unknown-b");
        assert!(result.unallocated.iter().all(|p| !p.is_allocated));
    }

    #[test]
    fn empty_registry_leaves_everything_unallocated() {
        let result =
            ReferenceReconciler::reconcile(1, 1, &[transaction("anything", 10)], &[]);
        assert!(result.allocated.is_empty());
        assert_eq!(result.unallocated.len(), 1);
    }

    #[test]
    fn duplicate_registry_references_resolve_to_the_last_entry() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let result = ReferenceReconciler::reconcile(
            1,
            1,
            &[transaction("shared", 10)],
            &[
                registry_entry("shared", first),
                registry_entry("SHARED", second),
            ],
        );

        assert_eq!(result.allocated[0].payer_id, second);
    }
}
