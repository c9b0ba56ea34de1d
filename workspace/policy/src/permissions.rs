//! Authorization predicate: which role may do what to which kind of resource.
//!
//! These checks are role-only. Row-level narrowing lives in
//! [`crate::visibility`], and per-row ownership in [`is_owner_or_oneself`].

use std::fmt;

use tracing::warn;

use model::entities::{document, lease, property, tenant};

use crate::actor::Actor;
use crate::error::{PolicyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
    Respond,
}

impl Action {
    fn is_crud(self) -> bool {
        !matches!(self, Action::Respond)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Action::List => "list",
            Action::Retrieve => "retrieve",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Respond => "respond to",
        };
        f.write_str(verb)
    }
}

/// One resource kind per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Property,
    PropertyImage,
    Unit,
    Tenant,
    Lease,
    Payment,
    Expense,
    Document,
    Notification,
    Account,
    JournalEntry,
    JournalEntryLine,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::User => "user",
            Resource::Property => "property",
            Resource::PropertyImage => "property image",
            Resource::Unit => "unit",
            Resource::Tenant => "tenant",
            Resource::Lease => "lease",
            Resource::Payment => "payment",
            Resource::Expense => "expense",
            Resource::Document => "document",
            Resource::Notification => "notification",
            Resource::Account => "account",
            Resource::JournalEntry => "journal entry",
            Resource::JournalEntryLine => "journal entry line",
        };
        f.write_str(name)
    }
}

pub fn is_admin(actor: &Actor) -> bool {
    matches!(actor, Actor::Admin { .. })
}

pub fn is_landlord(actor: &Actor) -> bool {
    matches!(actor, Actor::Landlord { .. })
}

pub fn is_tenant(actor: &Actor) -> bool {
    matches!(actor, Actor::Tenant { .. })
}

pub fn is_admin_or_landlord(actor: &Actor) -> bool {
    is_admin(actor) || is_landlord(actor)
}

/// Returns whether `actor` may perform `action` on resources of kind `resource`.
///
/// Fail-closed: any combination not listed below is denied.
pub fn can(actor: &Actor, action: Action, resource: Resource) -> bool {
    match resource {
        Resource::User => is_admin(actor) && action.is_crud(),
        Resource::Expense
        | Resource::Account
        | Resource::JournalEntry
        | Resource::JournalEntryLine => is_admin_or_landlord(actor) && action.is_crud(),
        Resource::Property
        | Resource::PropertyImage
        | Resource::Unit
        | Resource::Lease
        | Resource::Payment => match action {
            Action::List | Action::Retrieve => true,
            Action::Create | Action::Update | Action::Delete => is_admin_or_landlord(actor),
            Action::Respond => false,
        },
        Resource::Tenant => match action {
            Action::List | Action::Retrieve | Action::Update => true,
            Action::Create | Action::Delete => is_admin_or_landlord(actor),
            Action::Respond => false,
        },
        Resource::Document => action.is_crud(),
        Resource::Notification => match action {
            Action::List | Action::Retrieve | Action::Create | Action::Update => true,
            Action::Delete | Action::Respond => is_admin_or_landlord(actor),
        },
    }
}

/// Like [`can`], but returns a `Forbidden` error on denial.
pub fn authorize(actor: &Actor, action: Action, resource: Resource) -> Result<()> {
    if can(actor, action, resource) {
        return Ok(());
    }
    warn!(?actor, %action, %resource, "Permission denied");
    Err(PolicyError::Forbidden { action, resource })
}

/// Records that point back at a user, either as owner or as subject.
pub trait Owned {
    /// The `owner`/`landlord`/`uploaded_by` user, if the record has one.
    fn owner_id(&self) -> Option<i32> {
        None
    }

    /// The user the record is about, if any.
    fn subject_user_id(&self) -> Option<i32> {
        None
    }
}

impl Owned for property::Model {
    fn owner_id(&self) -> Option<i32> {
        Some(self.landlord_id)
    }
}

impl Owned for lease::Model {
    fn owner_id(&self) -> Option<i32> {
        Some(self.landlord_id)
    }
}

impl Owned for tenant::Model {
    fn subject_user_id(&self) -> Option<i32> {
        Some(self.user_id)
    }
}

impl Owned for document::Model {
    fn owner_id(&self) -> Option<i32> {
        self.uploaded_by
    }

    fn subject_user_id(&self) -> Option<i32> {
        self.user_id
    }
}

/// Admins pass; otherwise the actor must be the record's owner or its subject.
pub fn is_owner_or_oneself<R: Owned + ?Sized>(actor: &Actor, record: &R) -> bool {
    if is_admin(actor) {
        return true;
    }
    let me = Some(actor.user_id());
    if record.owner_id().is_some() && record.owner_id() == me {
        return true;
    }
    record.subject_user_id().is_some() && record.subject_user_id() == me
}

/// Like [`is_owner_or_oneself`], but returns a `Forbidden` error on denial.
pub fn authorize_owner<R: Owned + ?Sized>(
    actor: &Actor,
    action: Action,
    resource: Resource,
    record: &R,
) -> Result<()> {
    if is_owner_or_oneself(actor, record) {
        return Ok(());
    }
    warn!(?actor, %action, %resource, "Actor is neither owner nor subject");
    Err(PolicyError::Forbidden { action, resource })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Actor = Actor::Admin { user_id: 1 };
    const LANDLORD: Actor = Actor::Landlord { user_id: 2 };
    const TENANT: Actor = Actor::Tenant {
        user_id: 3,
        profile_id: Some(1),
    };

    #[test]
    fn test_role_checks() {
        assert!(is_admin(&ADMIN));
        assert!(!is_admin(&LANDLORD));
        assert!(is_landlord(&LANDLORD));
        assert!(is_tenant(&TENANT));
        assert!(is_admin_or_landlord(&ADMIN));
        assert!(is_admin_or_landlord(&LANDLORD));
        assert!(!is_admin_or_landlord(&TENANT));
    }

    #[test]
    fn test_users_are_admin_only() {
        for action in [Action::List, Action::Retrieve, Action::Create, Action::Update, Action::Delete] {
            assert!(can(&ADMIN, action, Resource::User));
            assert!(!can(&LANDLORD, action, Resource::User));
            assert!(!can(&TENANT, action, Resource::User));
        }
    }

    #[test]
    fn test_tenants_are_denied_ledger_and_expenses() {
        for resource in [
            Resource::Expense,
            Resource::Account,
            Resource::JournalEntry,
            Resource::JournalEntryLine,
        ] {
            assert!(!can(&TENANT, Action::List, resource));
            assert!(!can(&TENANT, Action::Create, resource));
            assert!(can(&LANDLORD, Action::Create, resource));
            assert!(can(&ADMIN, Action::Delete, resource));
        }
    }

    #[test]
    fn test_tenant_reads_but_cannot_write_property_chain() {
        for resource in [Resource::Property, Resource::Unit, Resource::Lease, Resource::Payment] {
            assert!(can(&TENANT, Action::List, resource));
            assert!(can(&TENANT, Action::Retrieve, resource));
            assert!(!can(&TENANT, Action::Create, resource));
            assert!(!can(&TENANT, Action::Delete, resource));
        }
    }

    #[test]
    fn test_tenant_profile_and_notification_rules() {
        assert!(can(&TENANT, Action::Update, Resource::Tenant));
        assert!(!can(&TENANT, Action::Create, Resource::Tenant));
        assert!(can(&TENANT, Action::Create, Resource::Notification));
        assert!(!can(&TENANT, Action::Delete, Resource::Notification));
        assert!(!can(&TENANT, Action::Respond, Resource::Notification));
        assert!(can(&LANDLORD, Action::Respond, Resource::Notification));
        assert!(!can(&ADMIN, Action::Respond, Resource::Lease));
        assert!(can(&TENANT, Action::Delete, Resource::Document));
    }

    #[test]
    fn test_authorize_returns_forbidden() {
        let err = authorize(&TENANT, Action::Create, Resource::Property).unwrap_err();
        assert!(matches!(
            err,
            PolicyError::Forbidden {
                action: Action::Create,
                resource: Resource::Property
            }
        ));
        assert_eq!(err.to_string(), "You do not have permission to create property");
    }

    struct Record {
        owner: Option<i32>,
        subject: Option<i32>,
    }

    impl Owned for Record {
        fn owner_id(&self) -> Option<i32> {
            self.owner
        }

        fn subject_user_id(&self) -> Option<i32> {
            self.subject
        }
    }

    #[test]
    fn test_is_owner_or_oneself() {
        let owned_by_landlord = Record { owner: Some(2), subject: None };
        let about_tenant = Record { owner: Some(2), subject: Some(3) };
        let orphan = Record { owner: None, subject: None };

        assert!(is_owner_or_oneself(&ADMIN, &orphan));
        assert!(is_owner_or_oneself(&LANDLORD, &owned_by_landlord));
        assert!(!is_owner_or_oneself(&TENANT, &owned_by_landlord));
        assert!(is_owner_or_oneself(&TENANT, &about_tenant));
        assert!(!is_owner_or_oneself(&LANDLORD, &orphan));
        assert!(!is_owner_or_oneself(&Actor::Landlord { user_id: 9 }, &about_tenant));
    }
}
