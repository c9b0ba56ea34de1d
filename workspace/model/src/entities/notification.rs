use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{lease, user};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    #[sea_orm(string_value = "complaint")]
    Complaint,
    #[sea_orm(string_value = "inquiry")]
    Inquiry,
    #[sea_orm(string_value = "announcement")]
    Announcement,
    #[sea_orm(string_value = "payment")]
    Payment,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

/// pending -> in_progress (landlord response) -> resolved / closed (manual).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// A tenant-raised request or complaint on a lease.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub lease_id: i32,
    pub category: NotificationCategory,
    pub priority: Priority,
    pub subject: String,
    pub description: String,
    pub status: NotificationStatus,
    pub landlord_response: Option<String>,
    pub responded_at: Option<DateTimeUtc>,
    pub responded_by: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "lease::Entity",
        from = "Column::LeaseId",
        to = "lease::Column::Id",
        on_delete = "Cascade"
    )]
    Lease,
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::RespondedBy",
        to = "user::Column::Id",
        on_delete = "SetNull"
    )]
    Responder,
}

impl Related<lease::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lease.def()
    }
}

timestamped_behavior!();
