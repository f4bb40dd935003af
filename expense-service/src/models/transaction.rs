use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::permission::Permission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }

    pub fn view_permission(&self) -> Permission {
        match self {
            TransactionKind::Expense => Permission::ExpensesView,
            TransactionKind::Income => Permission::IncomeView,
        }
    }

    pub fn create_permission(&self) -> Permission {
        match self {
            TransactionKind::Expense => Permission::ExpensesCreate,
            TransactionKind::Income => Permission::IncomeCreate,
        }
    }

    pub fn edit_permission(&self) -> Permission {
        match self {
            TransactionKind::Expense => Permission::ExpensesEdit,
            TransactionKind::Income => Permission::IncomeEdit,
        }
    }

    pub fn delete_permission(&self) -> Permission {
        match self {
            TransactionKind::Expense => Permission::ExpensesDelete,
            TransactionKind::Income => Permission::IncomeDelete,
        }
    }
}

/// An expense or income entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    pub family_id: String,
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: String,
    pub category_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub trip_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        family_id: String,
        kind: TransactionKind,
        amount: f64,
        description: String,
        category_id: String,
        date: NaiveDate,
        trip_id: Option<String>,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            family_id,
            kind,
            amount,
            description,
            category_id,
            date,
            trip_id,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}
