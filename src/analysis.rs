//! Aggregation of a user's transactions into per-category spending totals.

use std::collections::HashMap;

use crate::{goal::Goal, transaction::Transaction};

/// Sum the amounts of all expense transactions by trimmed category.
///
/// Only transactions whose type is exactly `expense` and whose category is
/// non-null are counted. Amounts are summed as raw floating point values;
/// there is no currency handling.
pub fn spending_by_category(transactions: &[Transaction]) -> HashMap<String, f64> {
    let mut spending = HashMap::new();

    for transaction in transactions {
        if transaction.transaction_type.as_deref() != Some("expense") {
            continue;
        }

        let Some(category) = &transaction.category else {
            continue;
        };

        *spending.entry(category.trim().to_owned()).or_insert(0.0) += transaction.amount;
    }

    spending
}

/// The categories with the highest spend, in descending order of total.
///
/// Ties are broken by category name so that the result is deterministic
/// regardless of hash map iteration order.
pub fn top_categories(spending: &HashMap<String, f64>, limit: usize) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = spending
        .iter()
        .map(|(category, total)| (category.clone(), *total))
        .collect();

    totals.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    totals.truncate(limit);

    totals
}

/// The texts of all open (not yet completed) goals.
pub fn open_goal_texts(goals: &[Goal]) -> Vec<String> {
    goals
        .iter()
        .filter(|goal| !goal.completed)
        .map(|goal| goal.text.clone())
        .collect()
}
