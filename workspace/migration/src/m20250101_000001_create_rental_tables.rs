use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

fn fk(name: &str) -> ForeignKeyCreateStatement {
    let mut key = ForeignKey::create();
    key.name(name).on_update(ForeignKeyAction::Cascade);
    key
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::Email))
                    .col(string(Users::PasswordHash))
                    .col(string(Users::FirstName).default(""))
                    .col(string(Users::LastName).default(""))
                    .col(string_len(Users::Role, 20))
                    .col(string_null(Users::Phone))
                    .col(string_null(Users::ProfilePicture))
                    .col(boolean(Users::MustChangePassword).default(false))
                    .col(boolean(Users::IsActive).default(true))
                    .col(timestamp_with_time_zone_null(Users::LastLoginAt))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .col(timestamp_with_time_zone(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Create properties table
        manager
            .create_table(
                Table::create()
                    .table(Properties::Table)
                    .if_not_exists()
                    .col(pk_auto(Properties::Id))
                    .col(integer(Properties::LandlordId))
                    .col(string(Properties::Name))
                    .col(string_len(Properties::PropertyType, 20))
                    .col(text_null(Properties::Description))
                    .col(string(Properties::Region))
                    .col(string(Properties::District))
                    .col(string_null(Properties::Ward))
                    .col(string(Properties::Street))
                    .col(integer(Properties::Bedrooms).default(0))
                    .col(integer(Properties::Bathrooms).default(0))
                    .col(decimal_len_null(Properties::AreaSqft, 16, 4))
                    .col(text_null(Properties::PaymentTerms))
                    .col(string_len(Properties::Status, 20).default("vacant"))
                    .col(timestamp_with_time_zone(Properties::CreatedAt))
                    .col(timestamp_with_time_zone(Properties::UpdatedAt))
                    .foreign_key(
                        fk("fk_property_landlord")
                            .from(Properties::Table, Properties::LandlordId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create property_images table
        manager
            .create_table(
                Table::create()
                    .table(PropertyImages::Table)
                    .if_not_exists()
                    .col(pk_auto(PropertyImages::Id))
                    .col(integer(PropertyImages::PropertyId))
                    .col(string(PropertyImages::Image))
                    .col(string_null(PropertyImages::Caption))
                    .col(boolean(PropertyImages::IsPrimary).default(false))
                    .col(timestamp_with_time_zone(PropertyImages::CreatedAt))
                    .col(timestamp_with_time_zone(PropertyImages::UpdatedAt))
                    .foreign_key(
                        fk("fk_property_image_property")
                            .from(PropertyImages::Table, PropertyImages::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create units table
        manager
            .create_table(
                Table::create()
                    .table(Units::Table)
                    .if_not_exists()
                    .col(pk_auto(Units::Id))
                    .col(integer(Units::PropertyId))
                    .col(string(Units::UnitNumber))
                    .col(integer_null(Units::Floor))
                    .col(integer(Units::Bedrooms).default(0))
                    .col(integer(Units::Bathrooms).default(0))
                    .col(decimal_len(Units::RentAmount, 16, 4))
                    .col(string_len(Units::Status, 20).default("available"))
                    .col(text_null(Units::Description))
                    .col(timestamp_with_time_zone(Units::CreatedAt))
                    .col(timestamp_with_time_zone(Units::UpdatedAt))
                    .foreign_key(
                        fk("fk_unit_property")
                            .from(Units::Table, Units::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_units_property_unit_number")
                    .table(Units::Table)
                    .col(Units::PropertyId)
                    .col(Units::UnitNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create tenants table (tenant profiles)
        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(pk_auto(Tenants::Id))
                    .col(integer(Tenants::UserId).unique_key())
                    .col(string(Tenants::Phone))
                    .col(string_null(Tenants::AlternativePhone))
                    .col(string_null(Tenants::IdentificationType))
                    .col(string_null(Tenants::IdentificationNumber))
                    .col(string_null(Tenants::EmergencyContactName))
                    .col(string_null(Tenants::EmergencyContactPhone))
                    .col(string_null(Tenants::EmergencyContactRelationship))
                    .col(string_null(Tenants::Occupation))
                    .col(string_null(Tenants::Employer))
                    .col(text_null(Tenants::Notes))
                    .col(timestamp_with_time_zone(Tenants::CreatedAt))
                    .col(timestamp_with_time_zone(Tenants::UpdatedAt))
                    .foreign_key(
                        fk("fk_tenant_user")
                            .from(Tenants::Table, Tenants::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create leases table
        manager
            .create_table(
                Table::create()
                    .table(Leases::Table)
                    .if_not_exists()
                    .col(pk_auto(Leases::Id))
                    .col(integer(Leases::PropertyId))
                    .col(integer(Leases::UnitId))
                    .col(integer(Leases::TenantId))
                    .col(integer(Leases::LandlordId))
                    .col(date(Leases::StartDate))
                    .col(date(Leases::EndDate))
                    .col(decimal_len(Leases::MonthlyRent, 16, 4))
                    .col(decimal_len(Leases::SecurityDeposit, 16, 4))
                    .col(string_len(Leases::Status, 20).default("pending"))
                    .col(string_null(Leases::Document))
                    .col(text_null(Leases::Notes))
                    .col(timestamp_with_time_zone(Leases::CreatedAt))
                    .col(timestamp_with_time_zone(Leases::UpdatedAt))
                    .foreign_key(
                        fk("fk_lease_property")
                            .from(Leases::Table, Leases::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        fk("fk_lease_unit")
                            .from(Leases::Table, Leases::UnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        fk("fk_lease_tenant")
                            .from(Leases::Table, Leases::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        fk("fk_lease_landlord")
                            .from(Leases::Table, Leases::LandlordId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create payments table
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(pk_auto(Payments::Id))
                    .col(integer(Payments::TenantId))
                    .col(integer(Payments::PropertyId))
                    .col(integer(Payments::LeaseId))
                    .col(decimal_len(Payments::Amount, 16, 4))
                    .col(string_len(Payments::PaymentMethod, 20))
                    .col(string_null(Payments::TransactionId))
                    .col(date(Payments::DueDate))
                    .col(date_null(Payments::PaidDate))
                    .col(string_len(Payments::Status, 20).default("pending"))
                    .col(string_null(Payments::ProofDocument))
                    .col(text_null(Payments::Notes))
                    .col(timestamp_with_time_zone(Payments::CreatedAt))
                    .col(timestamp_with_time_zone(Payments::UpdatedAt))
                    .foreign_key(
                        fk("fk_payment_tenant")
                            .from(Payments::Table, Payments::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        fk("fk_payment_property")
                            .from(Payments::Table, Payments::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        fk("fk_payment_lease")
                            .from(Payments::Table, Payments::LeaseId)
                            .to(Leases::Table, Leases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create expenses table
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(pk_auto(Expenses::Id))
                    .col(integer(Expenses::PropertyId))
                    .col(string(Expenses::Title))
                    .col(text_null(Expenses::Description))
                    .col(string_len(Expenses::Category, 20))
                    .col(decimal_len(Expenses::Amount, 16, 4))
                    .col(date(Expenses::Date))
                    .col(string_null(Expenses::Receipt))
                    .col(timestamp_with_time_zone(Expenses::CreatedAt))
                    .col(timestamp_with_time_zone(Expenses::UpdatedAt))
                    .foreign_key(
                        fk("fk_expense_property")
                            .from(Expenses::Table, Expenses::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create documents table
        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(pk_auto(Documents::Id))
                    .col(integer_null(Documents::LeaseId))
                    .col(integer_null(Documents::UserId))
                    .col(integer_null(Documents::PropertyId))
                    .col(string(Documents::Title))
                    .col(string(Documents::File))
                    .col(string_len(Documents::FileType, 20))
                    .col(text_null(Documents::Description))
                    .col(integer_null(Documents::UploadedBy))
                    .col(timestamp_with_time_zone(Documents::CreatedAt))
                    .col(timestamp_with_time_zone(Documents::UpdatedAt))
                    .foreign_key(
                        fk("fk_document_lease")
                            .from(Documents::Table, Documents::LeaseId)
                            .to(Leases::Table, Leases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        fk("fk_document_user")
                            .from(Documents::Table, Documents::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        fk("fk_document_property")
                            .from(Documents::Table, Documents::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        fk("fk_document_uploader")
                            .from(Documents::Table, Documents::UploadedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create notifications table
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(pk_auto(Notifications::Id))
                    .col(integer(Notifications::LeaseId))
                    .col(string_len(Notifications::Category, 20))
                    .col(string_len(Notifications::Priority, 20).default("medium"))
                    .col(string(Notifications::Subject))
                    .col(text(Notifications::Description))
                    .col(string_len(Notifications::Status, 20).default("pending"))
                    .col(text_null(Notifications::LandlordResponse))
                    .col(timestamp_with_time_zone_null(Notifications::RespondedAt))
                    .col(integer_null(Notifications::RespondedBy))
                    .col(timestamp_with_time_zone(Notifications::CreatedAt))
                    .col(timestamp_with_time_zone(Notifications::UpdatedAt))
                    .foreign_key(
                        fk("fk_notification_lease")
                            .from(Notifications::Table, Notifications::LeaseId)
                            .to(Leases::Table, Leases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        fk("fk_notification_responder")
                            .from(Notifications::Table, Notifications::RespondedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create accounts table (chart of accounts)
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(pk_auto(Accounts::Id))
                    .col(string(Accounts::Code).unique_key())
                    .col(string(Accounts::Name))
                    .col(string_len(Accounts::AccountType, 20))
                    .col(text_null(Accounts::Description))
                    .col(decimal_len(Accounts::Balance, 16, 4).default(0))
                    .col(integer_null(Accounts::ParentAccountId))
                    .col(boolean(Accounts::IsActive).default(true))
                    .col(timestamp_with_time_zone(Accounts::CreatedAt))
                    .col(timestamp_with_time_zone(Accounts::UpdatedAt))
                    .foreign_key(
                        fk("fk_account_parent")
                            .from(Accounts::Table, Accounts::ParentAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create journal_entries table
        manager
            .create_table(
                Table::create()
                    .table(JournalEntries::Table)
                    .if_not_exists()
                    .col(pk_auto(JournalEntries::Id))
                    .col(date(JournalEntries::EntryDate))
                    .col(text(JournalEntries::Description))
                    .col(string_null(JournalEntries::Reference))
                    .col(integer_null(JournalEntries::CreatedBy))
                    .col(timestamp_with_time_zone(JournalEntries::CreatedAt))
                    .col(timestamp_with_time_zone(JournalEntries::UpdatedAt))
                    .foreign_key(
                        fk("fk_journal_entry_creator")
                            .from(JournalEntries::Table, JournalEntries::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create journal_entry_lines table
        manager
            .create_table(
                Table::create()
                    .table(JournalEntryLines::Table)
                    .if_not_exists()
                    .col(pk_auto(JournalEntryLines::Id))
                    .col(integer(JournalEntryLines::JournalEntryId))
                    .col(integer(JournalEntryLines::AccountId))
                    .col(decimal_len(JournalEntryLines::Debit, 16, 4).default(0))
                    .col(decimal_len(JournalEntryLines::Credit, 16, 4).default(0))
                    .col(string_null(JournalEntryLines::Description))
                    .col(timestamp_with_time_zone(JournalEntryLines::CreatedAt))
                    .col(timestamp_with_time_zone(JournalEntryLines::UpdatedAt))
                    .foreign_key(
                        fk("fk_journal_entry_line_entry")
                            .from(JournalEntryLines::Table, JournalEntryLines::JournalEntryId)
                            .to(JournalEntries::Table, JournalEntries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        fk("fk_journal_entry_line_account")
                            .from(JournalEntryLines::Table, JournalEntryLines::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(JournalEntryLines::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(JournalEntries::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Documents::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Leases::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tenants::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Units::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PropertyImages::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Properties::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    Role,
    Phone,
    ProfilePicture,
    MustChangePassword,
    IsActive,
    LastLoginAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Properties {
    Table,
    Id,
    LandlordId,
    Name,
    PropertyType,
    Description,
    Region,
    District,
    Ward,
    Street,
    Bedrooms,
    Bathrooms,
    AreaSqft,
    PaymentTerms,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PropertyImages {
    Table,
    Id,
    PropertyId,
    Image,
    Caption,
    IsPrimary,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Units {
    Table,
    Id,
    PropertyId,
    UnitNumber,
    Floor,
    Bedrooms,
    Bathrooms,
    RentAmount,
    Status,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
    UserId,
    Phone,
    AlternativePhone,
    IdentificationType,
    IdentificationNumber,
    EmergencyContactName,
    EmergencyContactPhone,
    EmergencyContactRelationship,
    Occupation,
    Employer,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Leases {
    Table,
    Id,
    PropertyId,
    UnitId,
    TenantId,
    LandlordId,
    StartDate,
    EndDate,
    MonthlyRent,
    SecurityDeposit,
    Status,
    Document,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    TenantId,
    PropertyId,
    LeaseId,
    Amount,
    PaymentMethod,
    TransactionId,
    DueDate,
    PaidDate,
    Status,
    ProofDocument,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    Id,
    PropertyId,
    Title,
    Description,
    Category,
    Amount,
    Date,
    Receipt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Documents {
    Table,
    Id,
    LeaseId,
    UserId,
    PropertyId,
    Title,
    File,
    FileType,
    Description,
    UploadedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    LeaseId,
    Category,
    Priority,
    Subject,
    Description,
    Status,
    LandlordResponse,
    RespondedAt,
    RespondedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Code,
    Name,
    AccountType,
    Description,
    Balance,
    ParentAccountId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum JournalEntries {
    Table,
    Id,
    EntryDate,
    Description,
    Reference,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum JournalEntryLines {
    Table,
    Id,
    JournalEntryId,
    AccountId,
    Debit,
    Credit,
    Description,
    CreatedAt,
    UpdatedAt,
}
