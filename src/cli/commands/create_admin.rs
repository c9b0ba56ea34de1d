use anyhow::{Result, bail};
use model::entities::user::{self, Role};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, EntityTrait, QueryFilter, Set};
use tracing::{info, warn};

use crate::auth::hash_password;

/// Inserts an admin unless one with this username already exists.
///
/// Returns the admin's id.
pub async fn ensure_admin<C: ConnectionTrait>(
    db: &C,
    username: &str,
    email: &str,
    password: &str,
) -> Result<i32> {
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;

    if let Some(existing) = existing {
        if existing.role != Role::Admin {
            bail!("User '{}' exists but is a {:?}, not an admin", username, existing.role);
        }
        warn!("Admin '{}' already exists, leaving it unchanged", username);
        return Ok(existing.id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let admin = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        role: Set(Role::Admin),
        phone: Set(None),
        profile_picture: Set(None),
        must_change_password: Set(true),
        is_active: Set(true),
        last_login_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created admin '{}' with ID {}", username, admin.id);
    Ok(admin.id)
}

pub async fn create_admin(database_url: &str, username: &str, email: &str, password: &str) -> Result<()> {
    let db = Database::connect(database_url).await?;
    ensure_admin(&db, username, email, password).await?;
    Ok(())
}
