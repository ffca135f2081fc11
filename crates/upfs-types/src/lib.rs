//! Shared account and transaction types for upfs.
//!
//! This crate has **no internal upfs dependencies**. It is the leaf that the
//! kernel, the Up Bank client and the FUSE adapter all build on.
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`Account`]       | Remote account (id, name, kind, balance)     |
//! | [`AccountKind`]   | Transactional (spending) or Saver            |
//! | [`Transaction`]   | One immutable transaction record             |
//! | [`Status`]        | Held or Settled                              |
//! | [`Money`]         | Signed minor-unit amount with decimal codec  |
//! |-------------------|----------------------------------------------|

pub mod account;
pub mod money;
pub mod transaction;

pub use account::{Account, AccountKind};
pub use money::{Money, MoneyParseError};
pub use transaction::{Status, Transaction};
