use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{lease, property, user};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    #[sea_orm(string_value = "contract")]
    Contract,
    #[sea_orm(string_value = "id")]
    Id,
    #[sea_orm(string_value = "receipt")]
    Receipt,
    #[sea_orm(string_value = "invoice")]
    Invoice,
    #[sea_orm(string_value = "report")]
    Report,
    #[sea_orm(string_value = "photo")]
    Photo,
    #[sea_orm(string_value = "other")]
    Other,
}

/// An uploaded file loosely attached to a lease, a user and/or a property.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub lease_id: Option<i32>,
    pub user_id: Option<i32>,
    pub property_id: Option<i32>,
    pub title: String,
    pub file: String,
    pub file_type: FileType,
    pub description: Option<String>,
    pub uploaded_by: Option<i32>,
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
        from = "Column::UserId",
        to = "user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "property::Entity",
        from = "Column::PropertyId",
        to = "property::Column::Id",
        on_delete = "Cascade"
    )]
    Property,
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::UploadedBy",
        to = "user::Column::Id",
        on_delete = "SetNull"
    )]
    Uploader,
}

impl Related<lease::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lease.def()
    }
}

impl Related<property::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Property.def()
    }
}

timestamped_behavior!();
