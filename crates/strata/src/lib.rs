//! Type-erased, reference-counted handles over multi-dimensional host buffers.
//!
//! Typed data lives in an [`Image`]; wrapping it in a [`Buffer`] erases the
//! element type and rank into runtime tags, shares the storage between cheap
//! handle clones, and exposes a `#[repr(C)]` [`RawBuffer`] for compiled code.
//! [`Buffer::as_image`] recovers a typed view after checking both tags.

pub mod buffer;
mod env;
pub mod error;
pub mod host;
pub mod ir;
pub mod runtime;

pub use buffer::{image_accessor, Buffer, BufferContents};
pub use error::{BufferError, BufferResult};
pub use host::{Dimension, Element, ElementType, Image, Ownership, TypeCode, TypeErasedArray};
pub use ir::{Argument, ArgumentKind, BufferAccess, Expr};
pub use runtime::RawBuffer;
