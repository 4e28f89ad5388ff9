use chrono::Utc;
use promeconfig_common::validation::normalize_targets;
use promeconfig_common::{NewTarget, RelabelRule, ScrapeInterval, Target, TargetPatch};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::db::entities::target;
use crate::web::error::AppError;

fn rules_to_json(rules: Option<Vec<RelabelRule>>) -> Result<Option<serde_json::Value>, AppError> {
    rules.map(serde_json::to_value).transpose().map_err(AppError::from)
}

fn rules_from_json(value: Option<serde_json::Value>) -> Result<Option<Vec<RelabelRule>>, AppError> {
    value
        .filter(|v| !v.is_null())
        .map(serde_json::from_value)
        .transpose()
        .map_err(AppError::from)
}

/// Converts a row into the wire shape, decoding the JSON columns.
pub fn to_dto(model: target::Model) -> Result<Target, AppError> {
    let scrape_interval = model
        .scrape_interval
        .parse::<ScrapeInterval>()
        .map_err(AppError::InternalServerError)?;
    Ok(Target {
        id: model.id,
        user_id: model.user_id,
        job_name: model.job_name,
        targets: serde_json::from_value(model.targets)?,
        scrape_interval,
        metrics_path: model.metrics_path,
        relabel_configs: rules_from_json(model.relabel_configs)?,
        metric_relabel_configs: rules_from_json(model.metric_relabel_configs)?,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// Lists the user's targets, newest first.
pub async fn list_targets(db: &DatabaseConnection, user_id: &str) -> Result<Vec<Target>, AppError> {
    target::Entity::find()
        .filter(target::Column::UserId.eq(user_id))
        .order_by_desc(target::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(to_dto)
        .collect()
}

pub async fn create_target(
    db: &DatabaseConnection,
    user_id: &str,
    payload: NewTarget,
) -> Result<Target, AppError> {
    let now = Utc::now();
    let model = target::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_owned()),
        job_name: Set(payload.job_name.trim().to_owned()),
        targets: Set(serde_json::to_value(normalize_targets(payload.targets))?),
        scrape_interval: Set(payload.scrape_interval.as_str().to_owned()),
        metrics_path: Set(payload.metrics_path),
        relabel_configs: Set(rules_to_json(payload.relabel_configs)?),
        metric_relabel_configs: Set(rules_to_json(payload.metric_relabel_configs)?),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    to_dto(model)
}

/// Applies the fields present in `patch`. A row owned by someone else is
/// reported exactly like a missing one.
pub async fn update_target(
    db: &DatabaseConnection,
    user_id: &str,
    id: &str,
    patch: TargetPatch,
) -> Result<Target, AppError> {
    let existing = target::Entity::find_by_id(id.to_owned())
        .filter(target::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("target {id} not found")))?;

    let mut active = existing.into_active_model();
    if let Some(job_name) = patch.job_name {
        active.job_name = Set(job_name.trim().to_owned());
    }
    if let Some(targets) = patch.targets {
        active.targets = Set(serde_json::to_value(normalize_targets(targets))?);
    }
    if let Some(interval) = patch.scrape_interval {
        active.scrape_interval = Set(interval.as_str().to_owned());
    }
    if let Some(path) = patch.metrics_path {
        active.metrics_path = Set(path);
    }
    if patch.relabel_configs.is_some() {
        active.relabel_configs = Set(rules_to_json(patch.relabel_configs)?);
    }
    if patch.metric_relabel_configs.is_some() {
        active.metric_relabel_configs = Set(rules_to_json(patch.metric_relabel_configs)?);
    }
    active.updated_at = Set(Utc::now());

    to_dto(active.update(db).await?)
}

pub async fn delete_target(db: &DatabaseConnection, user_id: &str, id: &str) -> Result<(), AppError> {
    let result = target::Entity::delete_many()
        .filter(target::Column::Id.eq(id))
        .filter(target::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("target {id} not found")));
    }
    Ok(())
}
