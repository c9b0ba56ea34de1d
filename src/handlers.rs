pub mod accounts;
pub mod auth;
pub mod dashboard;
pub mod documents;
pub mod expenses;
pub mod health;
pub mod journal_entries;
pub mod journal_entry_lines;
pub mod leases;
pub mod notifications;
pub mod payments;
pub mod properties;
pub mod property_images;
pub mod tenants;
pub mod units;
pub mod users;
