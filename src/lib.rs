//! # Dues Ledger
//!
//! Membership dues tracking: members, their per-month payment matrix, and a
//! running total that is kept consistent with the matrix.
//!
//! ## Features
//!
//! - **Payment matrix**: every member carries a paid flag per year and month over a configurable year range
//! - **Derived totals**: single (7.5) and family (10) monthly rates, exact decimal arithmetic
//! - **Incremental toggling**: flipping a month adjusts the total by one rate, persisted in a single write
//! - **Reporting**: unpaid-month and unpaid-year filters, roster search and summaries
//! - **Reconciliation**: audit recorded totals against the payment matrix
//! - **Storage abstraction**: backend-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use dues_ledger::utils::MemoryStore;
//! use dues_ledger::{CreateMemberRequest, DuplicatePolicy, Ledger, MemberDetails, Month, UserType};
//!
//! # async fn run() -> dues_ledger::LedgerResult<()> {
//! let mut ledger = Ledger::new(MemoryStore::new());
//!
//! let request = CreateMemberRequest::new(MemberDetails::new("Jane", "Doe", "555-0100", UserType::Single));
//! if let Some(jane) = ledger.create_member(request, DuplicatePolicy::Warn).await?.into_member() {
//!     let jane = ledger.toggle_month_paid(&jane, 2024, Month::July).await?;
//!     assert_eq!(jane.total_amount_paid.to_string(), "7.5");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
