use chrono::Utc;
use promeconfig_common::{AiSettings, AiSettingsInput, AiSettingsPatch};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set,
};
use uuid::Uuid;

use crate::db::entities::ai_setting;
use crate::web::error::AppError;

pub async fn get_ai_settings(db: &DatabaseConnection, user_id: &str) -> Result<Option<AiSettings>, AppError> {
    Ok(ai_setting::Entity::find()
        .filter(ai_setting::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .map(AiSettings::from))
}

/// Inserts or replaces the user's settings in a single statement keyed on
/// `user_id`, then reads the surviving row back. Concurrent saves for the
/// same user never produce a second row.
pub async fn upsert_ai_settings(
    db: &DatabaseConnection,
    user_id: &str,
    input: AiSettingsInput,
) -> Result<AiSettings, AppError> {
    let now = Utc::now();
    let row = ai_setting::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_owned()),
        provider: Set(input.provider),
        api_key: Set(input.api_key),
        base_url: Set(input.base_url),
        model: Set(input.model),
        temperature: Set(input.temperature),
        created_at: Set(now),
        updated_at: Set(now),
    };

    ai_setting::Entity::insert(row)
        .on_conflict(
            OnConflict::column(ai_setting::Column::UserId)
                .update_columns([
                    ai_setting::Column::Provider,
                    ai_setting::Column::ApiKey,
                    ai_setting::Column::BaseUrl,
                    ai_setting::Column::Model,
                    ai_setting::Column::Temperature,
                    ai_setting::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    get_ai_settings(db, user_id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("AI settings vanished after upsert".into()))
}

pub async fn update_ai_settings(
    db: &DatabaseConnection,
    user_id: &str,
    id: &str,
    patch: AiSettingsPatch,
) -> Result<AiSettings, AppError> {
    let existing = ai_setting::Entity::find_by_id(id.to_owned())
        .filter(ai_setting::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("AI settings {id} not found")))?;

    let mut active = existing.into_active_model();
    if let Some(provider) = patch.provider {
        active.provider = Set(provider);
    }
    if patch.api_key.is_some() {
        active.api_key = Set(patch.api_key);
    }
    if patch.base_url.is_some() {
        active.base_url = Set(patch.base_url);
    }
    if let Some(model) = patch.model {
        active.model = Set(model);
    }
    if let Some(temperature) = patch.temperature {
        active.temperature = Set(temperature);
    }
    active.updated_at = Set(Utc::now());

    Ok(active.update(db).await?.into())
}

/// Removes the user's settings row, optionally pinned to a specific id.
/// Deleting settings that do not exist is a 404 so the caller can tell the
/// two apart.
pub async fn delete_ai_settings(
    db: &DatabaseConnection,
    user_id: &str,
    id: Option<&str>,
) -> Result<(), AppError> {
    let mut query = ai_setting::Entity::delete_many().filter(ai_setting::Column::UserId.eq(user_id));
    if let Some(id) = id {
        query = query.filter(ai_setting::Column::Id.eq(id));
    }
    let result = query.exec(db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("AI settings not found".into()));
    }
    Ok(())
}
