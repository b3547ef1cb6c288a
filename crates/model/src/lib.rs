//! Core domain types shared by every crate in the auction coordinator.
//!
//! This crate intentionally has no I/O: it only describes the shapes that
//! flow between the signature verifier, the stores, the auction controller
//! and the HTTP/WS boundary.

pub mod bid;
pub mod eip712;
pub mod error;
pub mod intent;

pub use alloy_primitives::{Address, B256 as Hash, U256 as Amount};
pub use {
    bid::{Bid, BidId, BidStatus},
    error::{ErrorKind, Field},
    intent::{Intent, IntentStatus},
};
