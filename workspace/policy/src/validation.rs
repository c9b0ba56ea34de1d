//! Write-path validation.
//!
//! Every check adds to one [`FieldErrors`] collection and the caller gets all
//! failures at once. Referenced rows are resolved through the actor's
//! visibility, so a row the actor cannot see is reported the same way as a
//! row that does not exist.

use std::borrow::Cow;
use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, PrimaryKeyTrait, QueryFilter};
use tracing::{debug, instrument};
use validator::{ValidationError, ValidationErrors};

use model::entities::{account, lease, payment, property, tenant, unit, user};

use crate::actor::Actor;
use crate::error::{PolicyError, Result};
use crate::visibility::{Scoped, find_visible};

/// Field-keyed validation failures.
#[derive(Debug, Default)]
pub struct FieldErrors(ValidationErrors);

impl FieldErrors {
    pub fn new() -> Self {
        Self(ValidationErrors::new())
    }

    /// Starts from the outcome of a derive-based `validate()` call.
    pub fn from_shape(shape: std::result::Result<(), ValidationErrors>) -> Self {
        match shape {
            Ok(()) => Self::new(),
            Err(errors) => Self(errors),
        }
    }

    pub fn add(&mut self, field: &'static str, code: &'static str, message: impl Into<Cow<'static, str>>) {
        let mut error = ValidationError::new(code);
        error.message = Some(message.into());
        self.0.add(field, error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gives up early, reporting what was collected so far.
    pub fn into_error(self) -> PolicyError {
        PolicyError::Validation(self.0)
    }

    /// `Ok` when nothing was recorded, otherwise every failure in one error.
    pub fn finish(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            debug!(errors = %self.0, "Validation failed");
            Err(PolicyError::Validation(self.0))
        }
    }
}

fn does_not_exist(errors: &mut FieldErrors, field: &'static str, id: i32) {
    errors.add(
        field,
        "does_not_exist",
        format!("Invalid pk \"{id}\" - object does not exist."),
    );
}

/// Resolves a reference inside the actor's visibility, recording a field
/// error when it is missing.
pub async fn resolve_visible<E, C>(
    db: &C,
    actor: &Actor,
    errors: &mut FieldErrors,
    field: &'static str,
    id: i32,
) -> Result<Option<E::Model>>
where
    E: Scoped,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    C: ConnectionTrait,
{
    let found = find_visible::<E, C>(db, actor, id).await?;
    if found.is_none() {
        does_not_exist(errors, field, id);
    }
    Ok(found)
}

/// Resolves a reference by existence only.
pub async fn resolve_existing<E, C>(
    db: &C,
    errors: &mut FieldErrors,
    field: &'static str,
    id: i32,
) -> Result<Option<E::Model>>
where
    E: EntityTrait,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    C: ConnectionTrait,
{
    let found = E::find_by_id(id).one(db).await?;
    if found.is_none() {
        does_not_exist(errors, field, id);
    }
    Ok(found)
}

fn positive(errors: &mut FieldErrors, field: &'static str, value: Decimal) {
    if value <= Decimal::ZERO {
        errors.add(field, "positive", "Ensure this value is greater than 0.");
    }
}

fn non_negative(errors: &mut FieldErrors, field: &'static str, value: Decimal) {
    if value < Decimal::ZERO {
        errors.add(field, "non_negative", "Ensure this value is greater than or equal to 0.");
    }
}

fn non_negative_count(errors: &mut FieldErrors, field: &'static str, value: i32) {
    if value < 0 {
        errors.add(field, "non_negative", "Ensure this value is greater than or equal to 0.");
    }
}

async fn check_user_role<C: ConnectionTrait>(
    db: &C,
    errors: &mut FieldErrors,
    field: &'static str,
    user_id: i32,
    role: user::Role,
    message: &'static str,
) -> Result<Option<user::Model>> {
    let found = resolve_existing::<user::Entity, C>(db, errors, field, user_id).await?;
    if let Some(user) = &found {
        if user.role != role {
            errors.add(field, "role", message);
        }
    }
    Ok(found)
}

/// Username must be free, ignoring the user being updated.
pub async fn check_username_available<C: ConnectionTrait>(
    db: &C,
    errors: &mut FieldErrors,
    username: &str,
    except_id: Option<i32>,
) -> Result<()> {
    let mut query = user::Entity::find().filter(user::Column::Username.eq(username));
    if let Some(id) = except_id {
        query = query.filter(user::Column::Id.ne(id));
    }
    if query.count(db).await? > 0 {
        errors.add("username", "unique", "A user with that username already exists.");
    }
    Ok(())
}

/// A role change must not strand rows that depend on the current role:
/// properties or leases owned as landlord, or a tenant profile.
pub async fn check_role_change<C: ConnectionTrait>(
    db: &C,
    errors: &mut FieldErrors,
    user: &user::Model,
    requested: user::Role,
) -> Result<()> {
    if requested == user.role {
        return Ok(());
    }
    match user.role {
        user::Role::Landlord => {
            let properties = property::Entity::find()
                .filter(property::Column::LandlordId.eq(user.id))
                .count(db)
                .await?;
            let leases = lease::Entity::find()
                .filter(lease::Column::LandlordId.eq(user.id))
                .count(db)
                .await?;
            if properties > 0 || leases > 0 {
                errors.add(
                    "role",
                    "role_in_use",
                    "Landlord still owns properties or leases; reassign them first.",
                );
            }
        }
        user::Role::Tenant => {
            let profiles = tenant::Entity::find()
                .filter(tenant::Column::UserId.eq(user.id))
                .count(db)
                .await?;
            if profiles > 0 {
                errors.add(
                    "role",
                    "role_in_use",
                    "Tenant still has a tenant profile; delete it first.",
                );
            }
        }
        user::Role::Admin => {}
    }
    Ok(())
}

pub struct PropertyDraft {
    pub landlord_id: i32,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area_sqft: Option<Decimal>,
}

#[instrument(skip(db, errors, draft), fields(landlord_id = draft.landlord_id))]
pub async fn validate_property<C: ConnectionTrait>(
    db: &C,
    mut errors: FieldErrors,
    draft: &PropertyDraft,
) -> Result<()> {
    check_user_role(
        db,
        &mut errors,
        "landlord",
        draft.landlord_id,
        user::Role::Landlord,
        "Selected user must have the landlord role.",
    )
    .await?;
    non_negative_count(&mut errors, "bedrooms", draft.bedrooms);
    non_negative_count(&mut errors, "bathrooms", draft.bathrooms);
    if let Some(area) = draft.area_sqft {
        positive(&mut errors, "area_sqft", area);
    }
    errors.finish()
}

pub struct UnitDraft<'a> {
    /// Set when updating, so the row does not collide with itself.
    pub id: Option<i32>,
    pub property_id: i32,
    pub unit_number: &'a str,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub rent_amount: Decimal,
}

#[instrument(skip(db, errors, draft), fields(property_id = draft.property_id))]
pub async fn validate_unit<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    mut errors: FieldErrors,
    draft: &UnitDraft<'_>,
) -> Result<()> {
    let property =
        resolve_visible::<property::Entity, C>(db, actor, &mut errors, "property", draft.property_id)
            .await?;
    if property.is_some() {
        let mut clash = unit::Entity::find()
            .filter(unit::Column::PropertyId.eq(draft.property_id))
            .filter(unit::Column::UnitNumber.eq(draft.unit_number));
        if let Some(id) = draft.id {
            clash = clash.filter(unit::Column::Id.ne(id));
        }
        if clash.count(db).await? > 0 {
            errors.add(
                "unit_number",
                "unique",
                "A unit with this number already exists in the selected property.",
            );
        }
    }
    non_negative_count(&mut errors, "bedrooms", draft.bedrooms);
    non_negative_count(&mut errors, "bathrooms", draft.bathrooms);
    positive(&mut errors, "rent_amount", draft.rent_amount);
    errors.finish()
}

pub struct TenantDraft {
    pub id: Option<i32>,
    pub user_id: i32,
}

#[instrument(skip(db, errors, draft), fields(user_id = draft.user_id))]
pub async fn validate_tenant<C: ConnectionTrait>(
    db: &C,
    mut errors: FieldErrors,
    draft: &TenantDraft,
) -> Result<()> {
    let user = check_user_role(
        db,
        &mut errors,
        "user",
        draft.user_id,
        user::Role::Tenant,
        "Selected user must have the tenant role.",
    )
    .await?;
    if user.is_some() {
        let mut existing = tenant::Entity::find().filter(tenant::Column::UserId.eq(draft.user_id));
        if let Some(id) = draft.id {
            existing = existing.filter(tenant::Column::Id.ne(id));
        }
        if existing.count(db).await? > 0 {
            errors.add("user", "unique", "This user already has a tenant profile.");
        }
    }
    errors.finish()
}

pub struct LeaseDraft {
    pub property_id: i32,
    pub unit_id: i32,
    pub tenant_id: i32,
    pub landlord_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub security_deposit: Decimal,
}

#[instrument(skip(db, errors, draft), fields(property_id = draft.property_id, unit_id = draft.unit_id))]
pub async fn validate_lease<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    mut errors: FieldErrors,
    draft: &LeaseDraft,
) -> Result<()> {
    if draft.end_date <= draft.start_date {
        errors.add("end_date", "date_order", "End date must be after start date.");
    }

    let property =
        resolve_visible::<property::Entity, C>(db, actor, &mut errors, "property", draft.property_id)
            .await?;
    let unit =
        resolve_visible::<unit::Entity, C>(db, actor, &mut errors, "unit", draft.unit_id).await?;
    if let Some(unit) = &unit {
        if unit.property_id != draft.property_id {
            errors.add(
                "unit",
                "unit_property",
                "Selected unit does not belong to the selected property.",
            );
        }
    }

    resolve_existing::<tenant::Entity, C>(db, &mut errors, "tenant", draft.tenant_id).await?;

    let landlord = check_user_role(
        db,
        &mut errors,
        "landlord",
        draft.landlord_id,
        user::Role::Landlord,
        "Selected user must have the landlord role.",
    )
    .await?;
    if let (Some(landlord), Some(property)) = (&landlord, &property) {
        if property.landlord_id != landlord.id {
            errors.add(
                "landlord",
                "property_owner",
                "Landlord must own the selected property.",
            );
        }
    }

    positive(&mut errors, "monthly_rent", draft.monthly_rent);
    non_negative(&mut errors, "security_deposit", draft.security_deposit);
    errors.finish()
}

pub struct PaymentDraft {
    pub tenant_id: i32,
    pub property_id: i32,
    pub lease_id: i32,
    pub amount: Decimal,
    pub status: payment::PaymentStatus,
    pub paid_date: Option<NaiveDate>,
}

#[instrument(skip(db, errors, draft), fields(lease_id = draft.lease_id))]
pub async fn validate_payment<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    mut errors: FieldErrors,
    draft: &PaymentDraft,
) -> Result<()> {
    if draft.status == payment::PaymentStatus::Completed && draft.paid_date.is_none() {
        errors.add(
            "paid_date",
            "required",
            "Paid date is required when the payment is completed.",
        );
    }
    positive(&mut errors, "amount", draft.amount);

    let lease =
        resolve_visible::<lease::Entity, C>(db, actor, &mut errors, "lease", draft.lease_id).await?;
    if let Some(lease) = lease {
        if lease.property_id != draft.property_id {
            errors.add("property", "lease_mismatch", "Property must match the lease.");
        }
        if lease.tenant_id != draft.tenant_id {
            errors.add("tenant", "lease_mismatch", "Tenant must match the lease.");
        }
    }
    errors.finish()
}

/// Expenses and property images only need a visible property.
pub async fn validate_property_child<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    mut errors: FieldErrors,
    property_id: i32,
    amount: Option<Decimal>,
) -> Result<()> {
    resolve_visible::<property::Entity, C>(db, actor, &mut errors, "property", property_id).await?;
    if let Some(amount) = amount {
        positive(&mut errors, "amount", amount);
    }
    errors.finish()
}

pub struct DocumentDraft {
    pub lease_id: Option<i32>,
    pub user_id: Option<i32>,
    pub property_id: Option<i32>,
}

pub async fn validate_document<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    mut errors: FieldErrors,
    draft: &DocumentDraft,
) -> Result<()> {
    if let Some(lease_id) = draft.lease_id {
        resolve_visible::<lease::Entity, C>(db, actor, &mut errors, "lease", lease_id).await?;
    }
    if let Some(property_id) = draft.property_id {
        resolve_visible::<property::Entity, C>(db, actor, &mut errors, "property", property_id)
            .await?;
    }
    if let Some(user_id) = draft.user_id {
        resolve_existing::<user::Entity, C>(db, &mut errors, "user", user_id).await?;
    }
    errors.finish()
}

/// Notifications must point at a lease the actor can see.
pub async fn validate_notification<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    mut errors: FieldErrors,
    lease_id: i32,
) -> Result<()> {
    resolve_visible::<lease::Entity, C>(db, actor, &mut errors, "lease", lease_id).await?;
    errors.finish()
}

pub struct AccountDraft<'a> {
    pub id: Option<i32>,
    pub code: &'a str,
    pub parent_account_id: Option<i32>,
}

pub async fn validate_account<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    mut errors: FieldErrors,
    draft: &AccountDraft<'_>,
) -> Result<()> {
    let mut clash = account::Entity::find().filter(account::Column::Code.eq(draft.code));
    if let Some(id) = draft.id {
        clash = clash.filter(account::Column::Id.ne(id));
    }
    if clash.count(db).await? > 0 {
        errors.add("code", "unique", "An account with this code already exists.");
    }

    if let Some(parent_id) = draft.parent_account_id {
        if draft.id == Some(parent_id) {
            errors.add("parent_account", "cycle", "An account cannot be its own parent.");
        } else {
            let parent =
                resolve_visible::<account::Entity, C>(db, actor, &mut errors, "parent_account", parent_id)
                    .await?;
            if let (Some(parent), Some(id)) = (parent, draft.id) {
                if parent_chain_reaches(db, parent, id).await? {
                    errors.add(
                        "parent_account",
                        "cycle",
                        "An account cannot be nested under one of its own sub-accounts.",
                    );
                }
            }
        }
    }
    errors.finish()
}

/// Whether `target` is `start` or one of its ancestors.
async fn parent_chain_reaches<C: ConnectionTrait>(
    db: &C,
    start: account::Model,
    target: i32,
) -> Result<bool> {
    let mut seen = HashSet::new();
    let mut current = Some(start);
    while let Some(account) = current {
        if account.id == target {
            return Ok(true);
        }
        if !seen.insert(account.id) {
            break;
        }
        current = match account.parent_account_id {
            Some(parent_id) => account::Entity::find_by_id(parent_id).one(db).await?,
            None => None,
        };
    }
    Ok(false)
}

pub struct RegistrationDraft<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
    pub role: user::Role,
}

/// Self-registration: unique username, matching passwords, no admin role.
pub async fn validate_registration<C: ConnectionTrait>(
    db: &C,
    mut errors: FieldErrors,
    draft: &RegistrationDraft<'_>,
) -> Result<()> {
    check_username_available(db, &mut errors, draft.username, None).await?;
    if draft.password != draft.password_confirm {
        errors.add("password", "mismatch", "Password fields didn't match.");
    }
    if draft.role == user::Role::Admin {
        errors.add("role", "forbidden_role", "Self-registration cannot create admin accounts.");
    }
    errors.finish()
}
