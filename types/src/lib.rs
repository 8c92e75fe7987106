//! Primitive type categories and the conversion classifier for Cinder.
//!
//! This crate is the leaf of the back end: it knows nothing about symbols or
//! trees, only about the fixed set of primitive categories and how values move
//! between them.
//!
//! # Example
//!
//! ```
//! use cinder_types::{ConversionKind, PrimitiveKind, PrimitiveType, classify};
//!
//! let int = PrimitiveType::new(PrimitiveKind::Int32);
//! let long = PrimitiveType::new(PrimitiveKind::Int64);
//! assert_eq!(classify(Some(int), Some(long)), ConversionKind::ImplicitNumeric);
//! assert_eq!(classify(Some(long), Some(int)), ConversionKind::ExplicitNumeric);
//! ```

#![no_std]
extern crate alloc;

pub mod conversion;
mod flags;
mod primitive;

pub use conversion::{ConversionKind, classify, classify_general, classify_index};
pub use flags::PrimFlags;
pub use primitive::{PrimitiveKind, PrimitiveType};
