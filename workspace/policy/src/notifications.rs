//! The landlord-response transition on notifications.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use tracing::{info, instrument};

use model::entities::notification::{self, NotificationStatus};

use crate::actor::Actor;
use crate::error::Result;
use crate::permissions::{Action, Resource, authorize};
use crate::validation::FieldErrors;
use crate::visibility::fetch_visible;

/// Records a landlord response.
///
/// Whatever the current status, the notification moves to `in_progress` and
/// stores the response text, the responder and the response time. Resolving
/// or closing stays a regular update.
#[instrument(skip(db, response))]
pub async fn respond<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    notification_id: i32,
    response: &str,
) -> Result<notification::Model> {
    authorize(actor, Action::Respond, Resource::Notification)?;
    let existing = fetch_visible::<notification::Entity, C>(db, actor, notification_id).await?;

    let mut errors = FieldErrors::new();
    if response.trim().is_empty() {
        errors.add("response", "required", "Response text is required.");
    }
    errors.finish()?;

    let mut active: notification::ActiveModel = existing.into();
    active.status = Set(NotificationStatus::InProgress);
    active.landlord_response = Set(Some(response.to_string()));
    active.responded_by = Set(Some(actor.user_id()));
    active.responded_at = Set(Some(Utc::now()));
    let updated = active.update(db).await?;

    info!(notification_id, responder = actor.user_id(), "Notification responded to");
    Ok(updated)
}

/// Tenants may edit their notifications but not move them between states.
pub fn check_status_change(
    actor: &Actor,
    errors: &mut FieldErrors,
    current: NotificationStatus,
    requested: Option<NotificationStatus>,
) {
    if let (Actor::Tenant { .. }, Some(requested)) = (actor, requested) {
        if requested != current {
            errors.add(
                "status",
                "forbidden_transition",
                "Tenants cannot change the status of a notification.",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyError;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_landlord_response_moves_to_in_progress() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        let pending = insert_notification(&db, &s.lease).await;
        assert_eq!(pending.status, NotificationStatus::Pending);

        let updated = respond(&db, &s.landlord_b, pending.id, "ok").await.unwrap();

        assert_eq!(updated.status, NotificationStatus::InProgress);
        assert_eq!(updated.landlord_response.as_deref(), Some("ok"));
        assert_eq!(updated.responded_by, Some(s.landlord_b.user_id()));
        assert!(updated.responded_at.is_some());
    }

    #[tokio::test]
    async fn test_response_resets_resolved_notification() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        let note = insert_notification(&db, &s.lease).await;
        let mut active: notification::ActiveModel = note.into();
        active.status = Set(NotificationStatus::Resolved);
        let resolved = active.update(&db).await.unwrap();

        let updated = respond(&db, &s.admin, resolved.id, "reopening").await.unwrap();
        assert_eq!(updated.status, NotificationStatus::InProgress);
        assert_eq!(updated.responded_by, Some(s.admin.user_id()));
    }

    #[tokio::test]
    async fn test_response_is_stored_as_sent() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        let note = insert_notification(&db, &s.lease).await;

        let updated = respond(&db, &s.landlord_b, note.id, "  On my way.\n").await.unwrap();
        assert_eq!(updated.landlord_response.as_deref(), Some("  On my way.\n"));
    }

    #[tokio::test]
    async fn test_respond_guards() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        let note = insert_notification(&db, &s.lease).await;

        let err = respond(&db, &s.tenant, note.id, "ok").await.unwrap_err();
        assert!(matches!(err, PolicyError::Forbidden { .. }));

        let err = respond(&db, &s.landlord_a, note.id, "ok").await.unwrap_err();
        assert!(matches!(err, PolicyError::NotFound(Resource::Notification)));

        let err = respond(&db, &s.landlord_b, note.id, "   ").await.unwrap_err();
        assert_eq!(failed_fields(err), vec!["response"]);
    }

    #[test]
    fn test_tenant_cannot_change_status() {
        let tenant = Actor::Tenant { user_id: 3, profile_id: Some(1) };
        let landlord = Actor::Landlord { user_id: 2 };

        let mut errors = FieldErrors::new();
        check_status_change(&tenant, &mut errors, NotificationStatus::Pending, Some(NotificationStatus::Pending));
        check_status_change(&tenant, &mut errors, NotificationStatus::Pending, None);
        check_status_change(&landlord, &mut errors, NotificationStatus::Pending, Some(NotificationStatus::Closed));
        assert!(errors.is_empty());

        check_status_change(&tenant, &mut errors, NotificationStatus::Pending, Some(NotificationStatus::Closed));
        assert_eq!(failed_fields(errors.finish().unwrap_err()), vec!["status"]);
    }
}
