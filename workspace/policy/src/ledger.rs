//! Double-entry checks for the bookkeeping ledger.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use model::entities::{account, journal_entry, journal_entry_line};

use crate::actor::Actor;
use crate::error::{PolicyError, Result};
use crate::validation::{FieldErrors, resolve_visible};
use crate::visibility::find_visible;

#[derive(Debug, Clone)]
pub struct LineDraft {
    pub account_id: i32,
    pub debit: Decimal,
    pub credit: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub entry_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
}

/// Debit and credit totals of one journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct EntryTotals {
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub is_balanced: bool,
}

impl EntryTotals {
    pub fn of<'a, I>(amounts: I) -> Self
    where
        I: IntoIterator<Item = (&'a Decimal, &'a Decimal)>,
    {
        let (total_debit, total_credit) = amounts
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(d, c), (debit, credit)| {
                (d + *debit, c + *credit)
            });
        EntryTotals {
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        }
    }

    pub fn of_lines(lines: &[journal_entry_line::Model]) -> Self {
        Self::of(lines.iter().map(|line| (&line.debit, &line.credit)))
    }
}

/// Exactly one side of a line carries a positive amount; neither is negative.
pub fn line_shape_error(debit: Decimal, credit: Decimal) -> Option<&'static str> {
    if debit < Decimal::ZERO || credit < Decimal::ZERO {
        return Some("Debit and credit cannot be negative.");
    }
    match (debit > Decimal::ZERO, credit > Decimal::ZERO) {
        (true, false) | (false, true) => None,
        (true, true) => Some("A line must either debit or credit an account, not both."),
        (false, false) => Some("A line must debit or credit a positive amount."),
    }
}

/// Validates a single line written through the line endpoints.
#[instrument(skip(db, errors, line))]
pub async fn validate_line<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    mut errors: FieldErrors,
    journal_entry_id: i32,
    line: &LineDraft,
) -> Result<()> {
    resolve_visible::<journal_entry::Entity, C>(db, actor, &mut errors, "journal_entry", journal_entry_id)
        .await?;
    resolve_visible::<account::Entity, C>(db, actor, &mut errors, "account", line.account_id).await?;
    if let Some(message) = line_shape_error(line.debit, line.credit) {
        errors.add("debit", "line_shape", message);
    }
    errors.finish()
}

/// Creates an entry together with its lines in one transaction.
///
/// Lines must be non-empty, individually well-formed, reference visible
/// accounts, and balance: total debit equals total credit.
#[instrument(skip(db, entry, lines), fields(lines = lines.len()))]
pub async fn create_entry<C>(
    db: &C,
    actor: &Actor,
    mut errors: FieldErrors,
    entry: EntryDraft,
    lines: Vec<LineDraft>,
) -> Result<(journal_entry::Model, Vec<journal_entry_line::Model>)>
where
    C: ConnectionTrait + TransactionTrait,
{
    if lines.is_empty() {
        errors.add("lines", "required", "A journal entry needs at least one line.");
    }
    for (index, line) in lines.iter().enumerate() {
        if let Some(message) = line_shape_error(line.debit, line.credit) {
            errors.add("lines", "line_shape", format!("Line {}: {message}", index + 1));
        }
        let found = find_visible::<account::Entity, C>(db, actor, line.account_id).await?;
        if found.is_none() {
            errors.add(
                "lines",
                "does_not_exist",
                format!("Line {}: account \"{}\" does not exist.", index + 1, line.account_id),
            );
        }
    }
    let totals = EntryTotals::of(lines.iter().map(|line| (&line.debit, &line.credit)));
    if !lines.is_empty() && !totals.is_balanced {
        errors.add(
            "lines",
            "unbalanced",
            format!(
                "Total debit ({}) must equal total credit ({}).",
                totals.total_debit, totals.total_credit
            ),
        );
    }
    errors.finish()?;

    let txn = db.begin().await?;
    let saved_entry = journal_entry::ActiveModel {
        entry_date: Set(entry.entry_date),
        description: Set(entry.description),
        reference: Set(entry.reference),
        created_by: Set(Some(actor.user_id())),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut saved_lines = Vec::with_capacity(lines.len());
    for line in lines {
        let saved = journal_entry_line::ActiveModel {
            journal_entry_id: Set(saved_entry.id),
            account_id: Set(line.account_id),
            debit: Set(line.debit),
            credit: Set(line.credit),
            description: Set(line.description),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        saved_lines.push(saved);
    }
    txn.commit().await?;

    info!(entry_id = saved_entry.id, total = %totals.total_debit, "Journal entry recorded");
    Ok((saved_entry, saved_lines))
}

/// Refuses to delete an account that ledger lines still reference.
pub async fn ensure_account_unreferenced<C: ConnectionTrait>(db: &C, account_id: i32) -> Result<()> {
    let references = journal_entry_line::Entity::find()
        .filter(journal_entry_line::Column::AccountId.eq(account_id))
        .count(db)
        .await?;
    if references > 0 {
        warn!(account_id, references, "Account still referenced by journal entry lines");
        return Err(PolicyError::Referential(format!(
            "Account is referenced by {references} journal entry line(s) and cannot be deleted."
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use model::entities::user;

    fn line(account_id: i32, debit: i64, credit: i64) -> LineDraft {
        LineDraft {
            account_id,
            debit: Decimal::new(debit, 0),
            credit: Decimal::new(credit, 0),
            description: None,
        }
    }

    fn entry() -> EntryDraft {
        EntryDraft {
            entry_date: date(2024, 2, 1),
            description: "Rent received".to_string(),
            reference: None,
        }
    }

    #[test]
    fn test_line_shape() {
        assert!(line_shape_error(Decimal::new(10, 0), Decimal::ZERO).is_none());
        assert!(line_shape_error(Decimal::ZERO, Decimal::new(10, 0)).is_none());
        assert!(line_shape_error(Decimal::ZERO, Decimal::ZERO).is_some());
        assert!(line_shape_error(Decimal::new(10, 0), Decimal::new(10, 0)).is_some());
        assert!(line_shape_error(Decimal::new(-10, 0), Decimal::ZERO).is_some());
    }

    #[tokio::test]
    async fn test_balanced_entry_is_written_atomically() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin", user::Role::Admin).await;
        let actor = Actor::new(&admin, None);
        let cash = insert_account(&db, "1000", None).await;
        let rent = insert_account(&db, "4000", None).await;

        let (saved, lines) = create_entry(
            &db,
            &actor,
            FieldErrors::new(),
            entry(),
            vec![line(cash.id, 500, 0), line(rent.id, 0, 500)],
        )
        .await
        .unwrap();

        assert_eq!(saved.created_by, Some(admin.id));
        assert_eq!(lines.len(), 2);
        let totals = EntryTotals::of_lines(&lines);
        assert!(totals.is_balanced);
        assert_eq!(totals.total_debit, Decimal::new(500, 0));
    }

    #[tokio::test]
    async fn test_unbalanced_entry_is_rejected_and_not_written() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin", user::Role::Admin).await;
        let actor = Actor::new(&admin, None);
        let cash = insert_account(&db, "1000", None).await;
        let rent = insert_account(&db, "4000", None).await;

        let err = create_entry(
            &db,
            &actor,
            FieldErrors::new(),
            entry(),
            vec![line(cash.id, 500, 0), line(rent.id, 0, 450)],
        )
        .await
        .unwrap_err();
        assert_eq!(failed_fields(err), vec!["lines"]);

        let err = create_entry(&db, &actor, FieldErrors::new(), entry(), vec![])
            .await
            .unwrap_err();
        assert_eq!(failed_fields(err), vec!["lines"]);

        assert_eq!(journal_entry::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(journal_entry_line::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_referenced_account_cannot_be_deleted() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin", user::Role::Admin).await;
        let actor = Actor::new(&admin, None);
        let cash = insert_account(&db, "1000", None).await;
        let rent = insert_account(&db, "4000", None).await;
        let unused = insert_account(&db, "9000", None).await;

        create_entry(
            &db,
            &actor,
            FieldErrors::new(),
            entry(),
            vec![line(cash.id, 500, 0), line(rent.id, 0, 500)],
        )
        .await
        .unwrap();

        let err = ensure_account_unreferenced(&db, cash.id).await.unwrap_err();
        assert!(matches!(err, PolicyError::Referential(_)));
        ensure_account_unreferenced(&db, unused.id).await.unwrap();
    }
}
