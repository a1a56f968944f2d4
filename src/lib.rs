//! Billing core for a goods-supply business: collision-free document
//! numbering per (shop, customer) pair, deterministic PPDA levy and VAT
//! computation, an invoice lifecycle with stock deduction, a payment
//! ledger with exact reversal, and customer account statements.
//!
//! The crate ships as a library; the composition root (HTTP service,
//! desktop app or batch job) wires the Postgres adapters in
//! [`infrastructure::persistence::postgres`] into the domain services and
//! use cases.

pub mod application;
pub mod domain;
pub mod infrastructure;
