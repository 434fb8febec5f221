//! Report entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ReportStatus {
    #[sea_orm(string_value = "open")]
    #[default]
    Open,
    #[sea_orm(string_value = "reviewed")]
    Reviewed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who submitted the report.
    #[sea_orm(indexed)]
    pub reporter_id: String,

    /// The user being reported.
    #[sea_orm(indexed)]
    pub target_user_id: String,

    /// Optional post being reported.
    #[sea_orm(nullable)]
    pub target_post_id: Option<String>,

    /// Short reason (e.g. "spam", "harassment").
    pub reason: String,

    /// Free-form description.
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Current status of the report.
    pub status: ReportStatus,

    /// Admin who reviewed the report.
    #[sea_orm(nullable)]
    pub reviewer_id: Option<String>,

    /// When the report was reviewed.
    #[sea_orm(nullable)]
    pub reviewed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
