//! Request bodies for the tenant-scoped resource endpoints.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::models::{ApprovalStatus, BillingCycle, BudgetPeriod, TransactionKind};

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 60, message = "Category name must be 1-60 characters"))]
    pub name: String,
    pub kind: TransactionKind,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 60, message = "Category name must be 1-60 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateTransactionRequest {
    pub kind: TransactionKind,

    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,

    #[validate(length(max = 500))]
    #[serde(default)]
    pub description: String,

    pub category_id: String,
    pub date: NaiveDate,
    pub trip_id: Option<String>,
}

/// The kind of a transaction is fixed at creation.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateTransactionRequest {
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: Option<f64>,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub category_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub trip_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateBudgetRequest {
    pub category_id: String,

    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,

    pub period: BudgetPeriod,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateBudgetRequest {
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: Option<f64>,

    pub period: Option<BudgetPeriod>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateTripRequest {
    #[validate(length(min = 1, max = 100, message = "Trip name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 100))]
    pub destination: Option<String>,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[validate(range(min = 0.0, message = "Budget must not be negative"))]
    pub budget: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateTripRequest {
    #[validate(length(min = 1, max = 100, message = "Trip name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100))]
    pub destination: Option<String>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    #[validate(range(min = 0.0, message = "Budget must not be negative"))]
    pub budget: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateSubscriptionRequest {
    #[validate(length(min = 1, max = 100, message = "Subscription name must be 1-100 characters"))]
    pub name: String,

    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,

    pub cycle: BillingCycle,
    pub next_due: NaiveDate,
    pub category_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateSubscriptionRequest {
    #[validate(length(min = 1, max = 100, message = "Subscription name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: Option<f64>,

    pub cycle: Option<BillingCycle>,
    pub next_due: Option<NaiveDate>,
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateApprovalRequest {
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,

    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateApprovalStatusRequest {
    pub status: ApprovalStatus,
}
