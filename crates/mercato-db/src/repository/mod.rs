//! Repository implementations for Mercato POS.
//!
//! One repository per aggregate:
//! - [`product`] - catalog lookup (read) and administration (insert)
//! - [`customer`] - loyalty balances with guarded deduction
//! - [`promotion`] - active-promotion queries for the pricing engine
//! - [`transaction`] - transaction records and line snapshots
//! - [`stock`] - the inventory mutation service and movement ledger

pub mod customer;
pub mod product;
pub mod promotion;
pub mod stock;
pub mod transaction;
