use std::collections::{HashMap, HashSet};

use crate::schemas::{Expense, UserId};

pub type Balance = HashMap<UserId, f64>;

/// Net position of everyone involved in a group's expenses, assuming every
/// current member owes an equal share of the total.
///
/// Positive means the group owes that user, negative means the user owes the
/// group. Members who joined late still pay a full share of every expense.
/// A payer who is not a member is credited with what they paid but is not
/// charged a share, so the balances always sum to zero (modulo rounding).
/// Without members there is nobody to split between and the result is empty.
pub fn compute_group_balance(members: &[UserId], expenses: &[Expense]) -> Balance {
    let members: HashSet<UserId> = members.iter().copied().collect();
    if members.is_empty() {
        return Balance::new();
    }

    let mut balance: Balance = members.iter().map(|member| (*member, 0.0)).collect();
    if expenses.is_empty() {
        return balance;
    }

    let total: f64 = expenses.iter().map(|expense| expense.amount).sum();
    let share = total / members.len() as f64;

    for expense in expenses {
        let amount = expense.amount;
        balance
            .entry(expense.paid_by)
            .and_modify(|v| *v += amount)
            .or_insert(amount);
    }
    for member in &members {
        if let Some(v) = balance.get_mut(member) {
            *v -= share;
        }
    }

    balance
        .into_iter()
        .map(|(id, v)| (id, round_to_2_decimals(v)))
        .collect()
}

/// Rounds to cents, with exact halves going away from zero (0.125 -> 0.13).
fn round_to_2_decimals(n: f64) -> f64 {
    let rounded = (n * 100.0).round() / 100.0;
    // -0.0 would print as "-0.00"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
