//! `lotledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod quantity;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::EndorsementId;
pub use quantity::{Tolerance, is_positive_finite, round_to_cents};
pub use value_object::ValueObject;
