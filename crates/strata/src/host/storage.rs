//! Aligned host allocations and the ownership tags attached to array storage.

use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::dimension::{self, Dimension};
use crate::env;
use crate::error::{BufferError, BufferResult};

/// Alignment of every fresh host allocation.
pub const HOST_ALIGNMENT: usize = 64;

/// How a container relates to the bytes it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ownership {
    /// Freshly allocated for this container.
    Owned,
    /// Aliases the allocation of the typed view it was built from.
    Shared,
    /// Described by a raw descriptor; the producer frees it.
    External,
    /// Shape only, no storage.
    Unallocated,
}

/// Heap block released exactly once, when the last `Arc` holding it drops.
#[derive(Debug)]
pub(crate) struct HostAllocation {
    ptr: NonNull<u8>,
    layout: Layout,
}

// The allocation is a plain byte block; synchronising access to its contents
// is left to callers.
unsafe impl Send for HostAllocation {}
unsafe impl Sync for HostAllocation {}

impl HostAllocation {
    /// Allocates `bytes` zeroed bytes aligned to [`HOST_ALIGNMENT`].
    pub(crate) fn new(bytes: usize) -> BufferResult<Self> {
        let limit = env::max_allocation_bytes();
        if bytes > limit {
            return Err(BufferError::allocation(format!(
                "{bytes} bytes exceeds the allocation limit of {limit} bytes"
            )));
        }
        let layout = Layout::from_size_align(bytes.max(1), HOST_ALIGNMENT)
            .map_err(|err| BufferError::allocation(format!("{bytes} bytes: {err}")))?;
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            BufferError::allocation(format!("allocator returned null for {bytes} bytes"))
        })?;
        tracing::debug!(bytes, align = HOST_ALIGNMENT, "allocated host storage");
        Ok(HostAllocation { ptr, layout })
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Capacity of the block in bytes.
    pub(crate) fn capacity(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for HostAllocation {
    fn drop(&mut self) {
        tracing::trace!(bytes = self.layout.size(), "releasing host storage");
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// Backing bytes of an array or typed view.
#[derive(Debug, Clone)]
pub(crate) enum Storage {
    Unallocated,
    Allocated(Arc<HostAllocation>),
    /// Externally owned; nothing to keep alive.
    External,
}

impl Storage {
    pub(crate) fn allocation(&self) -> Option<&Arc<HostAllocation>> {
        match self {
            Storage::Allocated(allocation) => Some(allocation),
            Storage::Unallocated | Storage::External => None,
        }
    }
}

/// Byte size of the elements addressed by `dims`.
pub(crate) fn addressed_bytes(elem_bytes: usize, dims: &[Dimension]) -> BufferResult<usize> {
    dimension::element_count(dims)
        .and_then(|count| count.checked_mul(elem_bytes))
        .ok_or_else(|| {
            BufferError::allocation(format!(
                "size of {:?} x {elem_bytes} bytes overflows",
                dims.iter().map(|dim| dim.extent).collect::<Vec<_>>()
            ))
        })
}

/// Allocates storage covering every element addressed by `dims` and returns
/// it with the host pointer of the element at the mins.
pub(crate) fn allocate(elem_bytes: usize, dims: &[Dimension]) -> BufferResult<(Storage, *mut u8)> {
    addressed_bytes(elem_bytes, dims)?;
    let (low, high) = dimension::offset_span(dims)
        .ok_or_else(|| BufferError::allocation("stride span overflows"))?;
    let elements = if dimension::element_count(dims) == Some(0) {
        0
    } else {
        high.checked_sub(low)
            .and_then(|span| span.checked_add(1))
            .and_then(|span| usize::try_from(span).ok())
            .ok_or_else(|| BufferError::allocation("stride span overflows"))?
    };
    let bytes = elements
        .checked_mul(elem_bytes)
        .ok_or_else(|| BufferError::allocation("stride span overflows"))?;
    let allocation = HostAllocation::new(bytes)?;
    let lead = low
        .checked_neg()
        .and_then(|lead| usize::try_from(lead).ok())
        .and_then(|lead| lead.checked_mul(elem_bytes))
        .ok_or_else(|| BufferError::allocation("stride span overflows"))?;
    let host = unsafe { allocation.as_ptr().add(lead) };
    Ok((Storage::Allocated(Arc::new(allocation)), host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_axis_points_host_past_the_lead() {
        let dims = [Dimension::new(0, 4, -1)];
        let (storage, host) = allocate(4, &dims).unwrap();
        let base = storage.allocation().unwrap().as_ptr();
        assert_eq!(host as usize - base as usize, 12);
    }

    #[test]
    fn addressed_bytes_detects_overflow() {
        let dims = [Dimension::new(0, i64::MAX, 1), Dimension::new(0, 4, 1)];
        assert!(matches!(
            addressed_bytes(8, &dims),
            Err(BufferError::Allocation { .. })
        ));
    }

    #[test]
    fn allocations_are_aligned_and_zeroed() {
        let allocation = HostAllocation::new(100).unwrap();
        assert_eq!(allocation.as_ptr() as usize % HOST_ALIGNMENT, 0);
        assert!(allocation.capacity() >= 100);
        let bytes = unsafe { std::slice::from_raw_parts(allocation.as_ptr(), 100) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_byte_allocation_still_has_an_address() {
        let allocation = HostAllocation::new(0).unwrap();
        assert!(!allocation.as_ptr().is_null());
    }

    #[test]
    fn oversized_allocation_fails() {
        let err = HostAllocation::new(usize::MAX).unwrap_err();
        assert!(matches!(err, BufferError::Allocation { .. }));
    }
}
