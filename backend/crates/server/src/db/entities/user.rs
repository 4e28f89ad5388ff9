use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::target::Entity")]
    Targets,
    #[sea_orm(has_many = "super::alert_rule::Entity")]
    AlertRules,
    #[sea_orm(has_one = "super::ai_setting::Entity")]
    AiSetting,
}

impl Related<super::target::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Targets.def()
    }
}

impl Related<super::alert_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AlertRules.def()
    }
}

impl Related<super::ai_setting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AiSetting.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for promeconfig_common::User {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            created_at: m.created_at,
            updated_at: Some(m.updated_at),
        }
    }
}
