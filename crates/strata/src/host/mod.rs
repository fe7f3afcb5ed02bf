//! Host-resident array storage, typed and type-erased.
//!
//! [`Image`] is the typed, dimensioned view callers build data with;
//! [`TypeErasedArray`] drops the compile-time element type and rank, keeping
//! them as runtime tags that every conversion back to an [`Image`] checks.

pub mod array;
pub mod dimension;
pub mod dtype;
pub mod image;
pub mod storage;

pub use array::TypeErasedArray;
pub use dimension::Dimension;
pub use dtype::{Element, ElementType, TypeCode};
pub use image::Image;
pub use storage::{Ownership, HOST_ALIGNMENT};
