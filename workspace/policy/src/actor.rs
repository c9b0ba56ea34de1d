use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::{debug, instrument};

use model::entities::{tenant, user};

use crate::error::Result;

/// The authenticated caller.
///
/// A tenant's profile is resolved once, when the request is authenticated.
/// `profile_id` is `None` for tenants that have no profile yet; such a tenant
/// sees nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Admin { user_id: i32 },
    Landlord { user_id: i32 },
    Tenant { user_id: i32, profile_id: Option<i32> },
}

impl Actor {
    /// Builds an actor from a user row and an already resolved profile id.
    pub fn new(user: &user::Model, profile_id: Option<i32>) -> Self {
        match user.role {
            user::Role::Admin => Actor::Admin { user_id: user.id },
            user::Role::Landlord => Actor::Landlord { user_id: user.id },
            user::Role::Tenant => Actor::Tenant {
                user_id: user.id,
                profile_id,
            },
        }
    }

    /// Builds an actor from a user row, looking up the tenant profile when needed.
    #[instrument(skip(db, user), fields(user_id = user.id))]
    pub async fn resolve<C: ConnectionTrait>(db: &C, user: &user::Model) -> Result<Self> {
        let profile_id = match user.role {
            user::Role::Tenant => tenant::Entity::find()
                .filter(tenant::Column::UserId.eq(user.id))
                .one(db)
                .await?
                .map(|profile| profile.id),
            _ => None,
        };
        let actor = Self::new(user, profile_id);
        debug!(?actor, "Resolved actor");
        Ok(actor)
    }

    pub fn user_id(&self) -> i32 {
        match *self {
            Actor::Admin { user_id }
            | Actor::Landlord { user_id }
            | Actor::Tenant { user_id, .. } => user_id,
        }
    }

    pub fn role(&self) -> user::Role {
        match self {
            Actor::Admin { .. } => user::Role::Admin,
            Actor::Landlord { .. } => user::Role::Landlord,
            Actor::Tenant { .. } => user::Role::Tenant,
        }
    }
}
