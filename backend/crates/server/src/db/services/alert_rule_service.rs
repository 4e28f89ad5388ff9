use chrono::Utc;
use promeconfig_common::{AlertRule, AlertRulePatch, NewAlertRule};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::db::entities::alert_rule;
use crate::web::error::AppError;

fn map_from_json(value: serde_json::Value) -> Result<BTreeMap<String, String>, AppError> {
    if value.is_null() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_value(value)?)
}

pub fn to_dto(model: alert_rule::Model) -> Result<AlertRule, AppError> {
    Ok(AlertRule {
        id: model.id,
        user_id: model.user_id,
        alert_name: model.alert_name,
        expr: model.expr,
        for_duration: model.for_duration,
        labels: map_from_json(model.labels)?,
        annotations: map_from_json(model.annotations)?,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub async fn list_alert_rules(db: &DatabaseConnection, user_id: &str) -> Result<Vec<AlertRule>, AppError> {
    alert_rule::Entity::find()
        .filter(alert_rule::Column::UserId.eq(user_id))
        .order_by_desc(alert_rule::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(to_dto)
        .collect()
}

pub async fn create_alert_rule(
    db: &DatabaseConnection,
    user_id: &str,
    payload: NewAlertRule,
) -> Result<AlertRule, AppError> {
    let now = Utc::now();
    let model = alert_rule::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_owned()),
        alert_name: Set(payload.alert_name.trim().to_owned()),
        expr: Set(payload.expr),
        for_duration: Set(payload.for_duration),
        labels: Set(serde_json::to_value(&payload.labels)?),
        annotations: Set(serde_json::to_value(&payload.annotations)?),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    to_dto(model)
}

pub async fn update_alert_rule(
    db: &DatabaseConnection,
    user_id: &str,
    id: &str,
    patch: AlertRulePatch,
) -> Result<AlertRule, AppError> {
    let existing = alert_rule::Entity::find_by_id(id.to_owned())
        .filter(alert_rule::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("alert rule {id} not found")))?;

    let mut active = existing.into_active_model();
    if let Some(name) = patch.alert_name {
        active.alert_name = Set(name.trim().to_owned());
    }
    if let Some(expr) = patch.expr {
        active.expr = Set(expr);
    }
    if let Some(for_duration) = patch.for_duration {
        active.for_duration = Set(for_duration);
    }
    if let Some(labels) = patch.labels {
        active.labels = Set(serde_json::to_value(&labels)?);
    }
    if let Some(annotations) = patch.annotations {
        active.annotations = Set(serde_json::to_value(&annotations)?);
    }
    active.updated_at = Set(Utc::now());

    to_dto(active.update(db).await?)
}

pub async fn delete_alert_rule(db: &DatabaseConnection, user_id: &str, id: &str) -> Result<(), AppError> {
    let result = alert_rule::Entity::delete_many()
        .filter(alert_rule::Column::Id.eq(id))
        .filter(alert_rule::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("alert rule {id} not found")));
    }
    Ok(())
}
