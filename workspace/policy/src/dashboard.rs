//! Read-only dashboard rollups.
//!
//! Everything is computed over the actor's visible rows, so the admin figures
//! are global and the landlord and tenant figures are scoped automatically.
//! Recomputed on every call.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use model::entities::{lease, notification, payment, property, tenant, unit};

use crate::actor::Actor;
use crate::error::Result;
use crate::visibility::{Scoped, visible};

const RECENT_LIMIT: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaymentCounts {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub overdue: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RecentPayment {
    pub id: i32,
    pub lease_id: i32,
    pub amount: Decimal,
    pub status: payment::PaymentStatus,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<payment::Model> for RecentPayment {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            lease_id: model.lease_id,
            amount: model.amount,
            status: model.status,
            due_date: model.due_date,
            paid_date: model.paid_date,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RecentNotification {
    pub id: i32,
    pub lease_id: i32,
    pub subject: String,
    pub category: notification::NotificationCategory,
    pub priority: notification::Priority,
    pub status: notification::NotificationStatus,
    pub created_at: DateTime<Utc>,
}

impl From<notification::Model> for RecentNotification {
    fn from(model: notification::Model) -> Self {
        Self {
            id: model.id,
            lease_id: model.lease_id,
            subject: model.subject,
            category: model.category,
            priority: model.priority,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActiveLease {
    pub id: i32,
    pub property_id: i32,
    pub unit_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
}

impl From<lease::Model> for ActiveLease {
    fn from(model: lease::Model) -> Self {
        Self {
            id: model.id,
            property_id: model.property_id,
            unit_id: model.unit_id,
            start_date: model.start_date,
            end_date: model.end_date,
            monthly_rent: model.monthly_rent,
        }
    }
}

/// Dashboard summary, one shape per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum DashboardStats {
    Admin {
        total_properties: u64,
        total_units: u64,
        total_tenants: u64,
        total_leases: u64,
        active_leases: u64,
        payments: PaymentCounts,
        total_revenue: Decimal,
        recent_payments: Vec<RecentPayment>,
    },
    Landlord {
        total_properties: u64,
        total_units: u64,
        occupied_units: u64,
        available_units: u64,
        total_tenants: u64,
        total_leases: u64,
        active_leases: u64,
        payments: PaymentCounts,
        total_revenue: Decimal,
        recent_payments: Vec<RecentPayment>,
        recent_notifications: Vec<RecentNotification>,
    },
    Tenant {
        active_lease: Option<ActiveLease>,
        payments: PaymentCounts,
        total_paid: Decimal,
        outstanding_balance: Decimal,
        recent_payments: Vec<RecentPayment>,
        recent_notifications: Vec<RecentNotification>,
    },
}

async fn count<E, C>(db: &C, actor: &Actor) -> Result<u64>
where
    E: Scoped,
    E::Model: Sync,
    C: ConnectionTrait,
{
    Ok(visible::<E>(actor).count(db).await?)
}

async fn payment_counts<C: ConnectionTrait>(db: &C, actor: &Actor) -> Result<PaymentCounts> {
    let with_status = |status: payment::PaymentStatus| {
        visible::<payment::Entity>(actor).filter(payment::Column::Status.eq(status))
    };
    Ok(PaymentCounts {
        total: count::<payment::Entity, C>(db, actor).await?,
        completed: with_status(payment::PaymentStatus::Completed).count(db).await?,
        pending: with_status(payment::PaymentStatus::Pending).count(db).await?,
        overdue: with_status(payment::PaymentStatus::Overdue).count(db).await?,
    })
}

const COMPLETED: &[payment::PaymentStatus] = &[payment::PaymentStatus::Completed];

/// Sum of visible payment amounts with one of `statuses`.
async fn payment_sum<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    statuses: &[payment::PaymentStatus],
) -> Result<Decimal> {
    let amounts: Vec<Decimal> = visible::<payment::Entity>(actor)
        .filter(payment::Column::Status.is_in(statuses.iter().copied()))
        .select_only()
        .column(payment::Column::Amount)
        .into_tuple()
        .all(db)
        .await?;
    Ok(amounts.into_iter().sum())
}

async fn recent_payments<C: ConnectionTrait>(db: &C, actor: &Actor) -> Result<Vec<RecentPayment>> {
    let rows = visible::<payment::Entity>(actor)
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .limit(RECENT_LIMIT)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(RecentPayment::from).collect())
}

async fn recent_notifications<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
) -> Result<Vec<RecentNotification>> {
    let rows = visible::<notification::Entity>(actor)
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .limit(RECENT_LIMIT)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(RecentNotification::from).collect())
}

async fn active_leases<C: ConnectionTrait>(db: &C, actor: &Actor) -> Result<u64> {
    Ok(visible::<lease::Entity>(actor)
        .filter(lease::Column::Status.eq(lease::LeaseStatus::Active))
        .count(db)
        .await?)
}

async fn units_with_status<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    status: unit::UnitStatus,
) -> Result<u64> {
    Ok(visible::<unit::Entity>(actor)
        .filter(unit::Column::Status.eq(status))
        .count(db)
        .await?)
}

/// Computes the dashboard summary for `actor`.
#[instrument(skip(db))]
pub async fn stats<C: ConnectionTrait>(db: &C, actor: &Actor) -> Result<DashboardStats> {
    let summary = match actor {
        Actor::Admin { .. } => DashboardStats::Admin {
            total_properties: count::<property::Entity, C>(db, actor).await?,
            total_units: count::<unit::Entity, C>(db, actor).await?,
            total_tenants: count::<tenant::Entity, C>(db, actor).await?,
            total_leases: count::<lease::Entity, C>(db, actor).await?,
            active_leases: active_leases(db, actor).await?,
            payments: payment_counts(db, actor).await?,
            total_revenue: payment_sum(db, actor, COMPLETED).await?,
            recent_payments: recent_payments(db, actor).await?,
        },
        Actor::Landlord { .. } => DashboardStats::Landlord {
            total_properties: count::<property::Entity, C>(db, actor).await?,
            total_units: count::<unit::Entity, C>(db, actor).await?,
            occupied_units: units_with_status(db, actor, unit::UnitStatus::Occupied).await?,
            available_units: units_with_status(db, actor, unit::UnitStatus::Available).await?,
            total_tenants: count::<tenant::Entity, C>(db, actor).await?,
            total_leases: count::<lease::Entity, C>(db, actor).await?,
            active_leases: active_leases(db, actor).await?,
            payments: payment_counts(db, actor).await?,
            total_revenue: payment_sum(db, actor, COMPLETED).await?,
            recent_payments: recent_payments(db, actor).await?,
            recent_notifications: recent_notifications(db, actor).await?,
        },
        // A tenant without a profile sees no rows, which yields the zeroed shape.
        Actor::Tenant { .. } => DashboardStats::Tenant {
            active_lease: visible::<lease::Entity>(actor)
                .filter(lease::Column::Status.eq(lease::LeaseStatus::Active))
                .order_by_desc(lease::Column::StartDate)
                .order_by_desc(lease::Column::Id)
                .one(db)
                .await?
                .map(ActiveLease::from),
            payments: payment_counts(db, actor).await?,
            total_paid: payment_sum(db, actor, COMPLETED).await?,
            outstanding_balance: payment_sum(db, actor, &payment::PaymentStatus::OUTSTANDING).await?,
            recent_payments: recent_payments(db, actor).await?,
            recent_notifications: recent_notifications(db, actor).await?,
        },
    };
    debug!(?summary, "Dashboard computed");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use model::entities::user;

    async fn seed_payments(db: &sea_orm::DatabaseConnection, s: &Scenario) {
        insert_payment(db, &s.lease, payment::PaymentStatus::Completed, Some(Decimal::new(500, 0))).await;
        insert_payment(db, &s.lease, payment::PaymentStatus::Completed, Some(Decimal::new(250, 0))).await;
        insert_payment(db, &s.lease, payment::PaymentStatus::Pending, Some(Decimal::new(500, 0))).await;
        insert_payment(db, &s.lease, payment::PaymentStatus::Overdue, Some(Decimal::new(100, 0))).await;
        insert_payment(db, &s.lease, payment::PaymentStatus::Cancelled, Some(Decimal::new(900, 0))).await;
        insert_payment(db, &s.lease, payment::PaymentStatus::Partial, Some(Decimal::new(40, 0))).await;
    }

    #[tokio::test]
    async fn test_admin_sees_global_counts() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        seed_payments(&db, &s).await;

        match stats(&db, &s.admin).await.unwrap() {
            DashboardStats::Admin {
                total_properties,
                total_units,
                total_tenants,
                total_leases,
                active_leases,
                payments,
                total_revenue,
                recent_payments,
            } => {
                assert_eq!(total_properties, 2);
                assert_eq!(total_units, 1);
                assert_eq!(total_tenants, 1);
                assert_eq!(total_leases, 1);
                assert_eq!(active_leases, 1);
                assert_eq!(
                    payments,
                    PaymentCounts { total: 6, completed: 2, pending: 1, overdue: 1 }
                );
                assert_eq!(total_revenue, Decimal::new(750, 0));
                assert_eq!(recent_payments.len(), 5);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_landlord_counts_are_scoped() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        seed_payments(&db, &s).await;
        insert_notification(&db, &s.lease).await;

        match stats(&db, &s.landlord_a).await.unwrap() {
            DashboardStats::Landlord {
                total_properties,
                total_units,
                total_leases,
                payments,
                total_revenue,
                recent_notifications,
                ..
            } => {
                assert_eq!(total_properties, 1);
                assert_eq!(total_units, 0);
                assert_eq!(total_leases, 0);
                assert_eq!(payments.total, 0);
                assert_eq!(total_revenue, Decimal::ZERO);
                assert!(recent_notifications.is_empty());
            }
            other => panic!("unexpected shape {other:?}"),
        }

        match stats(&db, &s.landlord_b).await.unwrap() {
            DashboardStats::Landlord {
                available_units,
                occupied_units,
                total_tenants,
                recent_notifications,
                total_revenue,
                ..
            } => {
                assert_eq!(available_units, 1);
                assert_eq!(occupied_units, 0);
                assert_eq!(total_tenants, 1);
                assert_eq!(recent_notifications.len(), 1);
                assert_eq!(total_revenue, Decimal::new(750, 0));
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tenant_balance_and_active_lease() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        seed_payments(&db, &s).await;

        match stats(&db, &s.tenant).await.unwrap() {
            DashboardStats::Tenant {
                active_lease,
                total_paid,
                outstanding_balance,
                ..
            } => {
                assert_eq!(active_lease.map(|l| l.id), Some(s.lease.id));
                assert_eq!(total_paid, Decimal::new(750, 0));
                assert_eq!(outstanding_balance, Decimal::new(640, 0));
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tenant_without_profile_gets_zeroed_shape() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        seed_payments(&db, &s).await;
        let newcomer = insert_user(&db, "newcomer", user::Role::Tenant).await;
        let actor = Actor::new(&newcomer, None);

        assert_eq!(
            stats(&db, &actor).await.unwrap(),
            DashboardStats::Tenant {
                active_lease: None,
                payments: PaymentCounts { total: 0, completed: 0, pending: 0, overdue: 0 },
                total_paid: Decimal::ZERO,
                outstanding_balance: Decimal::ZERO,
                recent_payments: vec![],
                recent_notifications: vec![],
            }
        );
    }

    #[tokio::test]
    async fn test_stats_are_idempotent() {
        let db = setup_db().await;
        let s = Scenario::seed(&db).await;
        seed_payments(&db, &s).await;
        insert_notification(&db, &s.lease).await;

        for actor in [&s.admin, &s.landlord_b, &s.tenant] {
            let first = stats(&db, actor).await.unwrap();
            let second = stats(&db, actor).await.unwrap();
            assert_eq!(first, second);
        }
    }
}
