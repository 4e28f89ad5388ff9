use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::db::entities::user;

/// Creates a new user. The caller has already hashed the password.
pub async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    password_hash: &str,
) -> Result<user::Model, DbErr> {
    let now = Utc::now();
    user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        email: Set(email.to_owned()),
        password_hash: Set(password_hash.to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

pub async fn get_user_by_id(db: &DatabaseConnection, user_id: &str) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(user_id.to_owned()).one(db).await
}

pub async fn get_user_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
}
