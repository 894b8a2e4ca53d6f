use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

use crate::auth::password::hash_password;
use crate::config::{AdminSeed, Config};
use crate::model::role::Role;

pub async fn init_db(config: &Config) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations applied");
    }

    Ok(pool)
}

/// Creates the configured administrator unless the username already exists.
pub async fn seed_admin(pool: &MySqlPool, seed: &AdminSeed) -> Result<()> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
    )
    .bind(&seed.username)
    .fetch_one(pool)
    .await?;

    if exists {
        return Ok(());
    }

    let hashed = hash_password(&seed.password)?;
    sqlx::query("INSERT INTO users (username, name, password, role_id) VALUES (?, ?, ?, ?)")
        .bind(&seed.username)
        .bind(&seed.name)
        .bind(hashed)
        .bind(Role::Admin.id())
        .execute(pool)
        .await
        .context("Failed to seed administrator")?;

    info!(username = %seed.username, "Administrator account created");
    Ok(())
}
