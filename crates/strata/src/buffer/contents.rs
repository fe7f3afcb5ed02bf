//! Reference-counted record that owns a buffer's array and debug name.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::env;
use crate::host::TypeErasedArray;

static BUFFER_NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique debug name of the form `b<N>`.
pub(crate) fn unique_name() -> String {
    format!("b{}", BUFFER_NAME_COUNTER.fetch_add(1, AtomicOrdering::Relaxed))
}

/// Sole owner of a buffer's array. Handles share it through an `Arc`, so the
/// record (and any storage it owns) drops exactly once, with the last handle.
#[derive(Debug)]
pub struct BufferContents {
    name: String,
    array: TypeErasedArray,
}

impl BufferContents {
    /// Wraps `array`; an empty `name` is replaced by a generated one.
    pub fn new(array: TypeErasedArray, name: impl Into<String>) -> Self {
        let mut name = name.into();
        if name.is_empty() {
            name = unique_name();
        }
        if env::trace_contents_enabled() {
            tracing::debug!(
                name = %name,
                ty = %array.ty(),
                rank = array.dimensions(),
                ownership = ?array.ownership(),
                "created buffer contents"
            );
        }
        BufferContents { name, array }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn array(&self) -> &TypeErasedArray {
        &self.array
    }
}

impl Drop for BufferContents {
    fn drop(&mut self) {
        if env::trace_contents_enabled() {
            tracing::debug!(
                name = %self.name,
                held_bytes = self.array.held_bytes(),
                "released buffer contents"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ElementType;

    #[test]
    fn empty_names_are_generated_and_distinct() {
        let array = TypeErasedArray::new(ElementType::int(8), &[2]).unwrap();
        let a = BufferContents::new(array.clone(), "");
        let b = BufferContents::new(array, String::new());
        assert!(a.name().starts_with('b'));
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn explicit_names_are_kept() {
        let contents = BufferContents::new(TypeErasedArray::default(), "weights");
        assert_eq!(contents.name(), "weights");
    }
}
