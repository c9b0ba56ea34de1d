//! SeaORM entity modules for the rental management schema.
//!
//! Ownership runs Property -> Unit -> Lease -> Payment, with tenant profiles
//! hanging off users and a small double-entry ledger on the side.

/// Implements `ActiveModelBehavior` so that `created_at` is stamped on insert
/// (unless the caller set it) and `updated_at` on every save.
macro_rules! timestamped_behavior {
    () => {
        #[async_trait::async_trait]
        impl ActiveModelBehavior for ActiveModel {
            async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
            where
                C: ConnectionTrait,
            {
                let now = chrono::Utc::now();
                if insert && self.created_at.is_not_set() {
                    self.created_at = sea_orm::ActiveValue::Set(now);
                }
                self.updated_at = sea_orm::ActiveValue::Set(now);
                Ok(self)
            }
        }
    };
}

pub mod account;
pub mod document;
pub mod expense;
pub mod journal_entry;
pub mod journal_entry_line;
pub mod lease;
pub mod notification;
pub mod payment;
pub mod property;
pub mod property_image;
pub mod tenant;
pub mod unit;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::account::Entity as Account;
    pub use super::document::Entity as Document;
    pub use super::expense::Entity as Expense;
    pub use super::journal_entry::Entity as JournalEntry;
    pub use super::journal_entry_line::Entity as JournalEntryLine;
    pub use super::lease::Entity as Lease;
    pub use super::notification::Entity as Notification;
    pub use super::payment::Entity as Payment;
    pub use super::property::Entity as Property;
    pub use super::property_image::Entity as PropertyImage;
    pub use super::tenant::Entity as Tenant;
    pub use super::unit::Entity as Unit;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    async fn insert_user(
        db: &DatabaseConnection,
        username: &str,
        role: user::Role,
    ) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.com")),
            password_hash: Set("x".to_string()),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            role: Set(role),
            must_change_password: Set(false),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    async fn insert_property(
        db: &DatabaseConnection,
        landlord_id: i32,
        name: &str,
    ) -> Result<property::Model, DbErr> {
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
    }

    async fn insert_unit(
        db: &DatabaseConnection,
        property_id: i32,
        unit_number: &str,
    ) -> Result<unit::Model, DbErr> {
        unit::ActiveModel {
            property_id: Set(property_id),
            unit_number: Set(unit_number.to_string()),
            bedrooms: Set(1),
            bathrooms: Set(1),
            rent_amount: Set(Decimal::new(50000, 2)),
            status: Set(unit::UnitStatus::Available),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_timestamps_are_stamped_on_insert_and_update() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let landlord = insert_user(&db, "landlord", user::Role::Landlord).await?;

        assert_eq!(landlord.created_at, landlord.updated_at);

        let mut active: user::ActiveModel = landlord.clone().into();
        active.phone = Set(Some("555-0100".to_string()));
        let updated = active.update(&db).await?;

        assert_eq!(updated.created_at, landlord.created_at);
        assert!(updated.updated_at >= landlord.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_unit_number_is_unique_within_property() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let landlord = insert_user(&db, "landlord", user::Role::Landlord).await?;
        let first = insert_property(&db, landlord.id, "First").await?;
        let second = insert_property(&db, landlord.id, "Second").await?;

        insert_unit(&db, first.id, "A1").await?;
        // Same label in another property is fine
        insert_unit(&db, second.id, "A1").await?;
        // Same label in the same property violates the unique index
        assert!(insert_unit(&db, first.id, "A1").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let landlord = insert_user(&db, "landlord", user::Role::Landlord).await?;
        let tenant_user = insert_user(&db, "tenant", user::Role::Tenant).await?;
        let property = insert_property(&db, landlord.id, "Harbour View").await?;
        let unit = insert_unit(&db, property.id, "101").await?;

        let profile = tenant::ActiveModel {
            user_id: Set(tenant_user.id),
            phone: Set("555-0101".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let lease = lease::ActiveModel {
            property_id: Set(property.id),
            unit_id: Set(unit.id),
            tenant_id: Set(profile.id),
            landlord_id: Set(landlord.id),
            start_date: Set(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            end_date: Set(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
            monthly_rent: Set(Decimal::new(50000, 2)),
            security_deposit: Set(Decimal::new(100000, 2)),
            status: Set(lease::LeaseStatus::Active),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        payment::ActiveModel {
            tenant_id: Set(profile.id),
            property_id: Set(property.id),
            lease_id: Set(lease.id),
            amount: Set(Decimal::new(50000, 2)),
            payment_method: Set(payment::PaymentMethod::MobileMoney),
            due_date: Set(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            paid_date: Set(Some(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap())),
            status: Set(payment::PaymentStatus::Completed),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        notification::ActiveModel {
            lease_id: Set(lease.id),
            category: Set(notification::NotificationCategory::Maintenance),
            priority: Set(notification::Priority::High),
            subject: Set("Leaking tap".to_string()),
            description: Set("Kitchen tap drips all night".to_string()),
            status: Set(notification::NotificationStatus::Pending),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Related lookups follow the ownership chain
        let units = property.find_related(Unit).all(&db).await?;
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_number, "101");

        let leases = Lease::find()
            .filter(lease::Column::TenantId.eq(profile.id))
            .all(&db)
            .await?;
        assert_eq!(leases.len(), 1);

        let payments = lease.find_related(Payment).all(&db).await?;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, payment::PaymentStatus::Completed);

        let notifications = lease.find_related(Notification).all(&db).await?;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].status, notification::NotificationStatus::Pending);

        // Deleting the property cascades down the chain
        Property::delete_by_id(property.id).exec(&db).await?;
        assert!(Lease::find().all(&db).await?.is_empty());
        assert!(Payment::find().all(&db).await?.is_empty());
        assert!(Notification::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_account_referenced_by_line_cannot_be_deleted() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let cash = account::ActiveModel {
            code: Set("1000".to_string()),
            name: Set("Cash".to_string()),
            account_type: Set(account::AccountType::Asset),
            balance: Set(Decimal::ZERO),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let entry = journal_entry::ActiveModel {
            entry_date: Set(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            description: Set("Rent received".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        journal_entry_line::ActiveModel {
            journal_entry_id: Set(entry.id),
            account_id: Set(cash.id),
            debit: Set(Decimal::new(50000, 2)),
            credit: Set(Decimal::ZERO),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        assert!(Account::delete_by_id(cash.id).exec(&db).await.is_err());
        assert_eq!(JournalEntryLine::find().all(&db).await?.len(), 1);
        Ok(())
    }
}
