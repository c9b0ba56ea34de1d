//! Row visibility per actor.
//!
//! Each entity kind maps an [`Actor`] to a [`Visibility`]: everything, nothing,
//! or the rows matching a condition. Landlord conditions walk the ownership
//! chain back to `properties.landlord_id`; tenant conditions walk back to the
//! tenant's own profile through `leases.tenant_id`. The hops are sub-selects
//! so they compose without joins and can be inspected as plain SQL.

use sea_orm::sea_query::{Condition, Expr, IntoCondition, Query, SelectStatement};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PrimaryKeyTrait, QueryFilter, Select,
};
use tracing::{debug, instrument};

use model::entities::{
    account, document, expense, journal_entry, journal_entry_line, lease, notification, payment,
    property, property_image, tenant, unit, user,
};

use crate::actor::Actor;
use crate::error::{PolicyError, Result};
use crate::permissions::Resource;

/// The subset of a table an actor may see.
#[derive(Debug, Clone)]
pub enum Visibility {
    Everything,
    Nothing,
    Matching(Condition),
}

impl Visibility {
    pub fn matching<C: IntoCondition>(condition: C) -> Self {
        Visibility::Matching(condition.into_condition())
    }

    /// Union of two visibilities.
    pub fn or(self, other: Visibility) -> Visibility {
        match (self, other) {
            (Visibility::Everything, _) | (_, Visibility::Everything) => Visibility::Everything,
            (Visibility::Nothing, other) | (other, Visibility::Nothing) => other,
            (Visibility::Matching(left), Visibility::Matching(right)) => {
                Visibility::Matching(Condition::any().add(left).add(right))
            }
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Visibility::Nothing)
    }

    /// Narrows `query` to the visible rows.
    pub fn apply<Q: QueryFilter>(self, query: Q) -> Q {
        match self {
            Visibility::Everything => query,
            Visibility::Nothing => query.filter(Expr::cust("1 = 0")),
            Visibility::Matching(condition) => query.filter(condition),
        }
    }
}

/// Ownership-chain hops. Each returns a single-column sub-select of ids.
pub mod hops {
    use super::*;

    /// `properties.id` owned by the landlord.
    pub fn properties_owned_by(landlord_id: i32) -> SelectStatement {
        Query::select()
            .column(property::Column::Id)
            .from(property::Entity)
            .and_where(property::Column::LandlordId.eq(landlord_id))
            .to_owned()
    }

    /// `leases.id` on any property the landlord owns.
    pub fn leases_on_properties_of(landlord_id: i32) -> SelectStatement {
        Query::select()
            .column(lease::Column::Id)
            .from(lease::Entity)
            .and_where(lease::Column::PropertyId.in_subquery(properties_owned_by(landlord_id)))
            .to_owned()
    }

    /// `tenants.id` holding a lease on any property the landlord owns.
    pub fn tenants_leasing_from(landlord_id: i32) -> SelectStatement {
        Query::select()
            .column(lease::Column::TenantId)
            .from(lease::Entity)
            .and_where(lease::Column::PropertyId.in_subquery(properties_owned_by(landlord_id)))
            .to_owned()
    }

    /// `leases.id` held by the tenant profile.
    pub fn leases_held_by(profile_id: i32) -> SelectStatement {
        leases_column_held_by(lease::Column::Id, profile_id)
    }

    /// `properties.id` the tenant profile holds a lease on.
    pub fn properties_leased_by(profile_id: i32) -> SelectStatement {
        leases_column_held_by(lease::Column::PropertyId, profile_id)
    }

    /// `column` of every lease the tenant profile holds.
    fn leases_column_held_by(column: lease::Column, profile_id: i32) -> SelectStatement {
        Query::select()
            .column(column)
            .from(lease::Entity)
            .and_where(lease::Column::TenantId.eq(profile_id))
            .to_owned()
    }
}

/// An entity kind with a per-actor visibility rule.
pub trait Scoped: EntityTrait {
    const RESOURCE: Resource;

    fn visibility(actor: &Actor) -> Visibility;
}

/// All rows of `E` the actor may see.
pub fn visible<E: Scoped>(actor: &Actor) -> Select<E> {
    E::visibility(actor).apply(E::find())
}

/// Looks up one row by id inside the actor's visibility.
#[instrument(skip(db), fields(resource = %E::RESOURCE))]
pub async fn find_visible<E, C>(db: &C, actor: &Actor, id: i32) -> Result<Option<E::Model>>
where
    E: Scoped,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    C: ConnectionTrait,
{
    let found = E::visibility(actor).apply(E::find_by_id(id)).one(db).await?;
    if found.is_none() {
        debug!(id, "Row missing or outside visibility");
    }
    Ok(found)
}

/// Same as [`find_visible`], reporting absence as `NotFound`.
pub async fn fetch_visible<E, C>(db: &C, actor: &Actor, id: i32) -> Result<E::Model>
where
    E: Scoped,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    C: ConnectionTrait,
{
    find_visible::<E, C>(db, actor, id)
        .await?
        .ok_or(PolicyError::NotFound(E::RESOURCE))
}

impl Scoped for user::Entity {
    const RESOURCE: Resource = Resource::User;

    fn visibility(actor: &Actor) -> Visibility {
        match *actor {
            Actor::Admin { .. } => Visibility::Everything,
            Actor::Landlord { user_id } | Actor::Tenant { user_id, profile_id: Some(_) } => {
                Visibility::matching(user::Column::Id.eq(user_id))
            }
            Actor::Tenant { profile_id: None, .. } => Visibility::Nothing,
        }
    }
}

impl Scoped for property::Entity {
    const RESOURCE: Resource = Resource::Property;

    fn visibility(actor: &Actor) -> Visibility {
        match *actor {
            Actor::Admin { .. } => Visibility::Everything,
            Actor::Landlord { user_id } => {
                Visibility::matching(property::Column::LandlordId.eq(user_id))
            }
            Actor::Tenant { profile_id: Some(profile_id), .. } => Visibility::matching(
                property::Column::Id.in_subquery(hops::properties_leased_by(profile_id)),
            ),
            Actor::Tenant { profile_id: None, .. } => Visibility::Nothing,
        }
    }
}

impl Scoped for property_image::Entity {
    const RESOURCE: Resource = Resource::PropertyImage;

    fn visibility(actor: &Actor) -> Visibility {
        match *actor {
            Actor::Admin { .. } => Visibility::Everything,
            Actor::Landlord { user_id } => Visibility::matching(
                property_image::Column::PropertyId.in_subquery(hops::properties_owned_by(user_id)),
            ),
            Actor::Tenant { profile_id: Some(profile_id), .. } => Visibility::matching(
                property_image::Column::PropertyId
                    .in_subquery(hops::properties_leased_by(profile_id)),
            ),
            Actor::Tenant { profile_id: None, .. } => Visibility::Nothing,
        }
    }
}

impl Scoped for unit::Entity {
    const RESOURCE: Resource = Resource::Unit;

    fn visibility(actor: &Actor) -> Visibility {
        match *actor {
            Actor::Admin { .. } => Visibility::Everything,
            Actor::Landlord { user_id } => Visibility::matching(
                unit::Column::PropertyId.in_subquery(hops::properties_owned_by(user_id)),
            ),
            Actor::Tenant { profile_id: Some(profile_id), .. } => Visibility::matching(
                unit::Column::PropertyId.in_subquery(hops::properties_leased_by(profile_id)),
            ),
            Actor::Tenant { profile_id: None, .. } => Visibility::Nothing,
        }
    }
}

impl Scoped for tenant::Entity {
    const RESOURCE: Resource = Resource::Tenant;

    fn visibility(actor: &Actor) -> Visibility {
        match *actor {
            Actor::Admin { .. } => Visibility::Everything,
            Actor::Landlord { user_id } => Visibility::matching(
                tenant::Column::Id.in_subquery(hops::tenants_leasing_from(user_id)),
            ),
            Actor::Tenant { profile_id: Some(profile_id), .. } => {
                Visibility::matching(tenant::Column::Id.eq(profile_id))
            }
            Actor::Tenant { profile_id: None, .. } => Visibility::Nothing,
        }
    }
}

impl Scoped for lease::Entity {
    const RESOURCE: Resource = Resource::Lease;

    fn visibility(actor: &Actor) -> Visibility {
        match *actor {
            Actor::Admin { .. } => Visibility::Everything,
            Actor::Landlord { user_id } => Visibility::matching(
                lease::Column::PropertyId.in_subquery(hops::properties_owned_by(user_id)),
            ),
            Actor::Tenant { profile_id: Some(profile_id), .. } => {
                Visibility::matching(lease::Column::TenantId.eq(profile_id))
            }
            Actor::Tenant { profile_id: None, .. } => Visibility::Nothing,
        }
    }
}

impl Scoped for payment::Entity {
    const RESOURCE: Resource = Resource::Payment;

    fn visibility(actor: &Actor) -> Visibility {
        match *actor {
            Actor::Admin { .. } => Visibility::Everything,
            Actor::Landlord { user_id } => Visibility::matching(
                payment::Column::PropertyId.in_subquery(hops::properties_owned_by(user_id)),
            ),
            Actor::Tenant { profile_id: Some(profile_id), .. } => Visibility::matching(
                payment::Column::LeaseId.in_subquery(hops::leases_held_by(profile_id)),
            ),
            Actor::Tenant { profile_id: None, .. } => Visibility::Nothing,
        }
    }
}

impl Scoped for expense::Entity {
    const RESOURCE: Resource = Resource::Expense;

    fn visibility(actor: &Actor) -> Visibility {
        match *actor {
            Actor::Admin { .. } => Visibility::Everything,
            Actor::Landlord { user_id } => Visibility::matching(
                expense::Column::PropertyId.in_subquery(hops::properties_owned_by(user_id)),
            ),
            Actor::Tenant { .. } => Visibility::Nothing,
        }
    }
}

impl Scoped for document::Entity {
    const RESOURCE: Resource = Resource::Document;

    fn visibility(actor: &Actor) -> Visibility {
        match *actor {
            Actor::Admin { .. } => Visibility::Everything,
            // Either path grants access: their property, or their upload.
            Actor::Landlord { user_id } => Visibility::matching(
                document::Column::PropertyId.in_subquery(hops::properties_owned_by(user_id)),
            )
            .or(Visibility::matching(document::Column::UploadedBy.eq(user_id))),
            Actor::Tenant { user_id, profile_id: Some(profile_id) } => {
                Visibility::matching(document::Column::UserId.eq(user_id))
                    .or(Visibility::matching(document::Column::UploadedBy.eq(user_id)))
                    .or(Visibility::matching(
                        document::Column::LeaseId.in_subquery(hops::leases_held_by(profile_id)),
                    ))
            }
            Actor::Tenant { profile_id: None, .. } => Visibility::Nothing,
        }
    }
}

impl Scoped for notification::Entity {
    const RESOURCE: Resource = Resource::Notification;

    fn visibility(actor: &Actor) -> Visibility {
        match *actor {
            Actor::Admin { .. } => Visibility::Everything,
            Actor::Landlord { user_id } => Visibility::matching(
                notification::Column::LeaseId.in_subquery(hops::leases_on_properties_of(user_id)),
            ),
            Actor::Tenant { profile_id: Some(profile_id), .. } => Visibility::matching(
                notification::Column::LeaseId.in_subquery(hops::leases_held_by(profile_id)),
            ),
            Actor::Tenant { profile_id: None, .. } => Visibility::Nothing,
        }
    }
}

/// Ledger tables are shared bookkeeping: staff see all of it, tenants none.
fn ledger_visibility(actor: &Actor) -> Visibility {
    match actor {
        Actor::Admin { .. } | Actor::Landlord { .. } => Visibility::Everything,
        Actor::Tenant { .. } => Visibility::Nothing,
    }
}

impl Scoped for account::Entity {
    const RESOURCE: Resource = Resource::Account;

    fn visibility(actor: &Actor) -> Visibility {
        ledger_visibility(actor)
    }
}

impl Scoped for journal_entry::Entity {
    const RESOURCE: Resource = Resource::JournalEntry;

    fn visibility(actor: &Actor) -> Visibility {
        ledger_visibility(actor)
    }
}

impl Scoped for journal_entry_line::Entity {
    const RESOURCE: Resource = Resource::JournalEntryLine;

    fn visibility(actor: &Actor) -> Visibility {
        ledger_visibility(actor)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DbBackend, QueryTrait};

    use super::*;
    use crate::test_support::*;

    fn sql<E: Scoped>(actor: &Actor) -> String {
        visible::<E>(actor).build(DbBackend::Sqlite).to_string()
    }

    #[test]
    fn test_union_combinator() {
        let a = || Visibility::matching(property::Column::Id.eq(1));

        assert!(matches!(Visibility::Everything.or(a()), Visibility::Everything));
        assert!(matches!(a().or(Visibility::Everything), Visibility::Everything));
        assert!(matches!(Visibility::Nothing.or(a()), Visibility::Matching(_)));
        assert!(Visibility::Nothing.or(Visibility::Nothing).is_nothing());
        assert!(matches!(a().or(a()), Visibility::Matching(_)));
    }

    #[test]
    fn test_filters_render_ownership_chain() {
        let landlord = Actor::Landlord { user_id: 7 };
        let tenant = Actor::Tenant { user_id: 8, profile_id: Some(4) };

        assert!(!sql::<property::Entity>(&Actor::Admin { user_id: 1 }).contains("WHERE"));
        assert!(sql::<property::Entity>(&landlord).contains("\"landlord_id\" = 7"));
        assert!(sql::<lease::Entity>(&tenant).contains("\"tenant_id\" = 4"));

        let notifications = sql::<notification::Entity>(&landlord);
        assert!(notifications.contains("\"leases\""));
        assert!(notifications.contains("\"properties\""));

        let documents = sql::<document::Entity>(&landlord);
        assert!(documents.contains(" OR "));
        assert!(documents.contains("\"uploaded_by\" = 7"));
    }

    #[test]
    fn test_tenant_without_profile_renders_empty_filter() {
        let tenant = Actor::Tenant { user_id: 8, profile_id: None };
        assert!(sql::<property::Entity>(&tenant).contains("1 = 0"));
        assert!(sql::<document::Entity>(&tenant).contains("1 = 0"));
        assert!(sql::<user::Entity>(&tenant).contains("1 = 0"));
    }

    #[tokio::test]
    async fn test_landlord_sees_only_own_properties() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;

        let a_props = visible::<property::Entity>(&s.landlord_a).all(&db).await.unwrap();
        assert_eq!(a_props.len(), 1);
        assert_eq!(a_props[0].id, s.p1.id);

        let b_props = visible::<property::Entity>(&s.landlord_b).all(&db).await.unwrap();
        assert_eq!(b_props.len(), 1);
        assert_eq!(b_props[0].id, s.p2.id);

        let all = visible::<property::Entity>(&s.admin).all(&db).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_lease_visibility_scenario() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;

        let a_leases = visible::<lease::Entity>(&s.landlord_a).all(&db).await.unwrap();
        assert!(a_leases.is_empty());

        let b_leases = visible::<lease::Entity>(&s.landlord_b).all(&db).await.unwrap();
        assert_eq!(b_leases.iter().map(|l| l.id).collect::<Vec<_>>(), vec![s.lease.id]);

        let t_leases = visible::<lease::Entity>(&s.tenant).all(&db).await.unwrap();
        assert_eq!(t_leases.iter().map(|l| l.id).collect::<Vec<_>>(), vec![s.lease.id]);
    }

    #[tokio::test]
    async fn test_tenant_sees_every_unit_of_a_leased_property() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        let neighbour = insert_unit(&db, s.p2.id, "U2").await;
        let elsewhere = insert_unit(&db, s.p1.id, "X1").await;

        let mut ids: Vec<i32> = visible::<unit::Entity>(&s.tenant)
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![s.u1.id, neighbour.id]);

        let hidden = fetch_visible::<unit::Entity, _>(&db, &s.tenant, elsewhere.id).await;
        assert!(matches!(hidden, Err(PolicyError::NotFound(Resource::Unit))));
    }

    #[tokio::test]
    async fn test_tenant_without_profile_sees_nothing() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        let user = insert_user(&db, "newcomer", user::Role::Tenant).await;
        let actor = Actor::resolve(&db, &user).await.unwrap();
        assert_eq!(actor, Actor::Tenant { user_id: user.id, profile_id: None });

        assert!(visible::<user::Entity>(&actor).all(&db).await.unwrap().is_empty());
        assert!(visible::<property::Entity>(&actor).all(&db).await.unwrap().is_empty());
        assert!(visible::<property_image::Entity>(&actor).all(&db).await.unwrap().is_empty());
        assert!(visible::<unit::Entity>(&actor).all(&db).await.unwrap().is_empty());
        assert!(visible::<tenant::Entity>(&actor).all(&db).await.unwrap().is_empty());
        assert!(visible::<lease::Entity>(&actor).all(&db).await.unwrap().is_empty());
        assert!(visible::<payment::Entity>(&actor).all(&db).await.unwrap().is_empty());
        assert!(visible::<expense::Entity>(&actor).all(&db).await.unwrap().is_empty());
        assert!(visible::<document::Entity>(&actor).all(&db).await.unwrap().is_empty());
        assert!(visible::<notification::Entity>(&actor).all(&db).await.unwrap().is_empty());
        assert!(visible::<account::Entity>(&actor).all(&db).await.unwrap().is_empty());

        let missing = fetch_visible::<lease::Entity, _>(&db, &actor, s.lease.id).await;
        assert!(matches!(missing, Err(PolicyError::NotFound(Resource::Lease))));
    }

    #[tokio::test]
    async fn test_document_visibility_is_a_union() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;

        // On A's property, uploaded by the admin
        let on_property = insert_document(&db, Some(s.p1.id), None, Some(s.admin.user_id())).await;
        // Uploaded by A, attached to B's property
        let uploaded = insert_document(&db, Some(s.p2.id), None, Some(s.landlord_a.user_id())).await;
        // Neither
        let unrelated = insert_document(&db, Some(s.p2.id), None, Some(s.admin.user_id())).await;

        let ids: Vec<i32> = visible::<document::Entity>(&s.landlord_a)
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert!(ids.contains(&on_property.id));
        assert!(ids.contains(&uploaded.id));
        assert!(!ids.contains(&unrelated.id));

        // The tenant reaches nothing here: none of these is on their lease,
        // about them, or uploaded by them
        let tenant_docs = visible::<document::Entity>(&s.tenant).all(&db).await.unwrap();
        assert!(tenant_docs.is_empty());

        let about_tenant =
            insert_document(&db, None, Some(s.tenant.user_id()), Some(s.admin.user_id())).await;
        let tenant_docs = visible::<document::Entity>(&s.tenant).all(&db).await.unwrap();
        assert_eq!(tenant_docs.len(), 1);
        assert_eq!(tenant_docs[0].id, about_tenant.id);
    }

    #[tokio::test]
    async fn test_chain_entities_follow_the_lease() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        let payment = insert_payment(&db, &s.lease, payment::PaymentStatus::Pending, None).await;
        let notification = insert_notification(&db, &s.lease).await;
        insert_expense(&db, s.p2.id).await;

        for actor in [&s.landlord_b, &s.tenant] {
            let payments = visible::<payment::Entity>(actor).all(&db).await.unwrap();
            assert_eq!(payments.len(), 1);
            assert_eq!(payments[0].id, payment.id);

            let notes = visible::<notification::Entity>(actor).all(&db).await.unwrap();
            assert_eq!(notes.len(), 1);
            assert_eq!(notes[0].id, notification.id);

            let units = visible::<unit::Entity>(actor).all(&db).await.unwrap();
            assert_eq!(units.len(), 1);
            assert_eq!(units[0].id, s.u1.id);

            let tenants = visible::<tenant::Entity>(actor).all(&db).await.unwrap();
            assert_eq!(tenants.len(), 1);
            assert_eq!(tenants[0].id, s.profile.id);
        }

        assert!(visible::<payment::Entity>(&s.landlord_a).all(&db).await.unwrap().is_empty());
        assert!(visible::<tenant::Entity>(&s.landlord_a).all(&db).await.unwrap().is_empty());
        assert_eq!(visible::<expense::Entity>(&s.landlord_b).all(&db).await.unwrap().len(), 1);
        assert!(visible::<expense::Entity>(&s.tenant).all(&db).await.unwrap().is_empty());
    }
}
