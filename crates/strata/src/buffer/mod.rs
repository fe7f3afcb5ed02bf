//! Reference-counted buffer handles.
//!
//! A [`Buffer`] shares ownership of one [`BufferContents`] record, which in
//! turn owns the [`crate::host::TypeErasedArray`]. Handles proxy metadata
//! queries onto the array, recover typed views with checked conversions, and
//! build symbolic accesses for the compiler layer.

pub mod contents;
pub mod handle;

pub use contents::BufferContents;
pub use handle::{image_accessor, Buffer};
