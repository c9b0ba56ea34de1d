//! Fixtures shared by the policy unit tests.

use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

use model::entities::{
    account, document, expense, lease, notification, payment, property, tenant, unit, user,
};

use crate::actor::Actor;

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.execute_unprepared("PRAGMA foreign_keys = ON;").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn insert_user(db: &DatabaseConnection, username: &str, role: user::Role) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set("not-a-real-hash".to_string()),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        role: Set(role),
        must_change_password: Set(false),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_property(db: &DatabaseConnection, landlord_id: i32, name: &str) -> property::Model {
    property::ActiveModel {
        landlord_id: Set(landlord_id),
        name: Set(name.to_string()),
        property_type: Set(property::PropertyType::Residential),
        region: Set("Coast".to_string()),
        district: Set("Central".to_string()),
        street: Set("1 Harbour Road".to_string()),
        bedrooms: Set(2),
        bathrooms: Set(1),
        status: Set(property::PropertyStatus::Vacant),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_unit(db: &DatabaseConnection, property_id: i32, unit_number: &str) -> unit::Model {
    unit::ActiveModel {
        property_id: Set(property_id),
        unit_number: Set(unit_number.to_string()),
        bedrooms: Set(1),
        bathrooms: Set(1),
        rent_amount: Set(Decimal::new(500, 0)),
        status: Set(unit::UnitStatus::Available),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_account(
    db: &DatabaseConnection,
    code: &str,
    parent_account_id: Option<i32>,
) -> account::Model {
    account::ActiveModel {
        code: Set(code.to_string()),
        name: Set(format!("Account {code}")),
        account_type: Set(account::AccountType::Asset),
        balance: Set(Decimal::ZERO),
        parent_account_id: Set(parent_account_id),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_profile(db: &DatabaseConnection, user_id: i32) -> tenant::Model {
    tenant::ActiveModel {
        user_id: Set(user_id),
        phone: Set("555-0101".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_lease(
    db: &DatabaseConnection,
    unit: &unit::Model,
    profile_id: i32,
    landlord_id: i32,
    status: lease::LeaseStatus,
) -> lease::Model {
    lease::ActiveModel {
        property_id: Set(unit.property_id),
        unit_id: Set(unit.id),
        tenant_id: Set(profile_id),
        landlord_id: Set(landlord_id),
        start_date: Set(date(2024, 1, 1)),
        end_date: Set(date(2024, 12, 31)),
        monthly_rent: Set(Decimal::new(500, 0)),
        security_deposit: Set(Decimal::new(1000, 0)),
        status: Set(status),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_payment(
    db: &DatabaseConnection,
    lease: &lease::Model,
    status: payment::PaymentStatus,
    amount: Option<Decimal>,
) -> payment::Model {
    let paid_date = (status == payment::PaymentStatus::Completed).then(|| date(2024, 1, 4));
    payment::ActiveModel {
        tenant_id: Set(lease.tenant_id),
        property_id: Set(lease.property_id),
        lease_id: Set(lease.id),
        amount: Set(amount.unwrap_or(Decimal::new(500, 0))),
        payment_method: Set(payment::PaymentMethod::Cash),
        due_date: Set(date(2024, 1, 5)),
        paid_date: Set(paid_date),
        status: Set(status),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_notification(db: &DatabaseConnection, lease: &lease::Model) -> notification::Model {
    notification::ActiveModel {
        lease_id: Set(lease.id),
        category: Set(notification::NotificationCategory::Maintenance),
        priority: Set(notification::Priority::Medium),
        subject: Set("Broken window".to_string()),
        description: Set("The bedroom window does not close".to_string()),
        status: Set(notification::NotificationStatus::Pending),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_expense(db: &DatabaseConnection, property_id: i32) -> expense::Model {
    expense::ActiveModel {
        property_id: Set(property_id),
        title: Set("Gutter repair".to_string()),
        category: Set(expense::ExpenseCategory::Repair),
        amount: Set(Decimal::new(120, 0)),
        date: Set(date(2024, 3, 1)),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_document(
    db: &DatabaseConnection,
    property_id: Option<i32>,
    user_id: Option<i32>,
    uploaded_by: Option<i32>,
) -> document::Model {
    document::ActiveModel {
        property_id: Set(property_id),
        user_id: Set(user_id),
        lease_id: Set(None),
        title: Set("Inspection report".to_string()),
        file: Set("documents/report.pdf".to_string()),
        file_type: Set(document::FileType::Report),
        uploaded_by: Set(uploaded_by),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Landlord A owns P1 (no units). Landlord B owns P2 with unit U1,
/// leased to the tenant through an active lease.
pub struct Scenario {
    pub admin: Actor,
    pub landlord_a: Actor,
    pub landlord_b: Actor,
    pub tenant: Actor,
    pub p1: property::Model,
    pub p2: property::Model,
    pub u1: unit::Model,
    pub profile: tenant::Model,
    pub lease: lease::Model,
}

impl Scenario {
    pub async fn seed(db: &DatabaseConnection) -> Self {
        let admin = insert_user(db, "admin", user::Role::Admin).await;
        let landlord_a = insert_user(db, "landlord_a", user::Role::Landlord).await;
        let landlord_b = insert_user(db, "landlord_b", user::Role::Landlord).await;
        let tenant_user = insert_user(db, "tenant", user::Role::Tenant).await;

        let p1 = insert_property(db, landlord_a.id, "Hillside").await;
        let p2 = insert_property(db, landlord_b.id, "Harbour View").await;
        let u1 = insert_unit(db, p2.id, "U1").await;
        let profile = insert_profile(db, tenant_user.id).await;
        let lease = insert_lease(db, &u1, profile.id, landlord_b.id, lease::LeaseStatus::Active).await;

        Scenario {
            admin: Actor::new(&admin, None),
            landlord_a: Actor::new(&landlord_a, None),
            landlord_b: Actor::new(&landlord_b, None),
            tenant: Actor::new(&tenant_user, Some(profile.id)),
            p1,
            p2,
            u1,
            profile,
            lease,
        }
    }
}

/// Field names of a validation failure, sorted.
pub fn failed_fields(err: crate::PolicyError) -> Vec<String> {
    match err {
        crate::PolicyError::Validation(errors) => {
            let mut fields: Vec<String> =
                errors.field_errors().keys().map(|field| field.to_string()).collect();
            fields.sort();
            fields
        }
        other => panic!("expected a validation failure, got {other:?}"),
    }
}
