//! Post-commit payment notifications

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::AllocatedPayment;

/// Notification recorded for an organization owner when a payment is
/// allocated to a payer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

impl PaymentNotification {
    /// Build the notification for one allocated payment, addressed to the
    /// organization owner.
    pub fn for_allocated_payment(
        owner: Uuid,
        organization_name: &str,
        payment: &AllocatedPayment,
    ) -> Self {
        let amount = format_zar(&payment.amount);
        Self {
            user_id: owner,
            kind: "payment".to_string(),
            title: "New Payment Received".to_string(),
            message: format!(
                "Payer {} paid {} to {}",
                payment.payer_id, amount, organization_name
            ),
            data: serde_json::json!({
                "payerId": payment.payer_id,
                "amount": payment.amount.to_string(),
                "organizationName": organization_name,
            }),
        }
    }
}

/// Format an amount as South African rand with two decimals and comma
/// thousands separators, e.g. `R 14,269.04`.
pub fn format_zar(amount: &BigDecimal) -> String {
    let rounded = amount.with_scale(2);
    let as_string = rounded.to_string();
    let (integer_part, fraction_part) = as_string.split_once('.').unwrap_or((&as_string, "00"));

    let (sign, digits) = match integer_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer_part),
    };

    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}R {grouped}.{fraction_part}")
}
