use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TransactionKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(family_id: String, name: String, kind: TransactionKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            family_id,
            name,
            kind,
            created_at: Utc::now(),
        }
    }
}

const DEFAULT_EXPENSE_CATEGORIES: &[&str] = &[
    "Groceries",
    "Housing",
    "Utilities",
    "Transportation",
    "Health",
    "Entertainment",
    "Education",
    "Other",
];

const DEFAULT_INCOME_CATEGORIES: &[&str] = &["Salary", "Bonus", "Investments", "Other Income"];

/// Categories seeded into a newly registered family.
pub fn default_categories(family_id: &str) -> Vec<Category> {
    DEFAULT_EXPENSE_CATEGORIES
        .iter()
        .map(|name| (name, TransactionKind::Expense))
        .chain(
            DEFAULT_INCOME_CATEGORIES
                .iter()
                .map(|name| (name, TransactionKind::Income)),
        )
        .map(|(name, kind)| Category::new(family_id.to_string(), name.to_string(), kind))
        .collect()
}
