//! Dao Common - entity store and progression core for the Dao tracker
//!
//! Local-first habit tracking around a cultivation progression ladder:
//! JSON-file entity stores for Cultivation and Practice records, plus
//! the pure calculator that derives density, trend, and breakthrough
//! outcomes from them.

pub mod config;
pub mod entities;
pub mod journal;
pub mod progression;
pub mod seed;
pub mod store;

pub use entities::*;
pub use store::{Entity, EntityStore, StoreError};
