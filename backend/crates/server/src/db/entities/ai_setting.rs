use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// At most one row per user; `user_id` carries the unique constraint the
/// upsert conflicts on.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ai_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub user_id: String,
    pub provider: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    #[sea_orm(column_type = "Double")]
    pub temperature: f64,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for promeconfig_common::AiSettings {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            provider: m.provider,
            api_key: m.api_key,
            base_url: m.base_url,
            model: m.model,
            temperature: m.temperature,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
