pub mod entities;
pub mod services;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use std::time::Duration;
use tracing::info;

use entities::{ai_setting, alert_rule, target, user};

/// Opens the pool. SQLite gets a single connection so writers never race
/// on the file lock.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(10)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    if database_url.starts_with("sqlite:") {
        opt.max_connections(1).min_connections(1);
    }
    Database::connect(opt).await
}

/// Creates any missing table from the entity definitions. Parents come
/// first so foreign keys resolve.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statements = vec![
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(target::Entity),
        schema.create_table_from_entity(alert_rule::Entity),
        schema.create_table_from_entity(ai_setting::Entity),
    ];
    for stmt in statements.iter_mut() {
        stmt.if_not_exists();
        db.execute(backend.build(&*stmt)).await?;
    }
    info!(?backend, "Database schema is up to date.");
    Ok(())
}
