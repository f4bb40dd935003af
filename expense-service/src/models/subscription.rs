use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Weekly,
    Monthly,
    Yearly,
}

/// Recurring charge such as a streaming service or insurance premium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub amount: f64,
    pub cycle: BillingCycle,
    pub next_due: NaiveDate,
    pub category_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        family_id: String,
        name: String,
        amount: f64,
        cycle: BillingCycle,
        next_due: NaiveDate,
        category_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            family_id,
            name,
            amount,
            cycle,
            next_due,
            category_id,
            created_at: now,
            updated_at: now,
        }
    }
}
