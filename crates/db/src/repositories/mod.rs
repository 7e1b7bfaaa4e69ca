//! Repositories for chart and tenant maintenance.
//!
//! Posting itself goes through the store implementations in
//! [`crate::store`].

pub mod account;
pub mod tenant;

pub use account::{AccountError, AccountRepository, CreateAccountInput};
pub use tenant::TenantProfileRepository;
