use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    #[serde(rename = "_id")]
    pub id: String,
    pub family_id: String,
    pub name: String,
    #[serde(default)]
    pub destination: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub budget: Option<f64>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(
        family_id: String,
        name: String,
        destination: Option<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        budget: Option<f64>,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            family_id,
            name,
            destination,
            start_date,
            end_date,
            budget,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}
