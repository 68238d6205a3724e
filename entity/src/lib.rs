//! Persistent CRM records.

pub mod category;
pub mod choices;
pub mod company;
pub mod individual_contact;
pub mod opportunity;
pub mod role_group;
pub mod service;
pub mod user;
pub mod user_group;
pub mod user_secret;

pub use choices::{LeadSource, RelationTier};
