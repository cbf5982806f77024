use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A backend-owned window over which expenses accumulate until closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpensePeriod {
    pub id: i64,
    #[serde(default)]
    pub room_fkey: Option<i64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl ExpensePeriod {
    pub fn total_cost(&self) -> f64 {
        self.expenses.iter().map(|e| e.cost).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub cost: f64,
    #[serde(default)]
    pub description: Option<String>,
    /// Roommate who paid
    #[serde(default)]
    pub roommate_fkey: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, alias = "expenses")]
    pub shares: Vec<ExpenseShare>,
}

/// One roommate's portion of an expense, in percent (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseShare {
    #[serde(alias = "roommate_fkey")]
    pub roommate_id: i64,
    pub percentage: f64,
}

/// Body of `POST /expense`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewExpense {
    pub title: String,
    pub cost: f64,
    pub description: String,
    pub expenses: Vec<ExpenseShare>,
}

impl NewExpense {
    /// An expense split in equal percentages between `roommate_ids`.
    pub fn split_evenly(title: &str, cost: f64, description: &str, roommate_ids: &[i64]) -> Self {
        let percentage = if roommate_ids.is_empty() {
            0.0
        } else {
            100.0 / roommate_ids.len() as f64
        };

        Self {
            title: title.to_string(),
            cost,
            description: description.to_string(),
            expenses: roommate_ids
                .iter()
                .map(|&roommate_id| ExpenseShare { roommate_id, percentage })
                .collect(),
        }
    }
}

/// Net balance per roommate: positive means the room owes them money.
///
/// Each payer is credited the full cost, and every participant is debited
/// their portion. Expenses without shares are split equally between
/// `roommate_ids`. Expenses without a known payer are ignored.
pub fn balances(expenses: &[Expense], roommate_ids: &[i64]) -> BTreeMap<i64, f64> {
    let mut sheet: BTreeMap<i64, f64> = roommate_ids.iter().map(|&id| (id, 0.0)).collect();

    for expense in expenses {
        let Some(payer) = expense.roommate_fkey else {
            continue;
        };

        if expense.shares.is_empty() {
            if roommate_ids.is_empty() {
                continue;
            }
            let portion = expense.cost / roommate_ids.len() as f64;
            for &id in roommate_ids {
                *sheet.entry(id).or_insert(0.0) -= portion;
            }
        } else {
            for share in &expense.shares {
                let portion = expense.cost * share.percentage / 100.0;
                *sheet.entry(share.roommate_id).or_insert(0.0) -= portion;
            }
        }

        *sheet.entry(payer).or_insert(0.0) += expense.cost;
    }

    sheet
}
