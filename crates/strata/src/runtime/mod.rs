//! Plain descriptor handed across the compiled-code boundary.
//!
//! [`RawBuffer`] mirrors a type-erased array as a `#[repr(C)]` struct: a type
//! tag, a pointer to `dimensions` per-axis descriptors, and the host pointer of
//! the element at the mins. Arrays keep one alive next to their metadata so
//! [`crate::Buffer::raw_buffer`] can hand out a stable pointer.

use std::ptr;

use crate::error::{BufferError, BufferResult};
use crate::host::dimension::Dimension;
use crate::host::dtype::{ElementType, TypeCode};

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawBuffer {
    pub type_code: u8,
    pub type_bits: u8,
    pub type_lanes: u16,
    pub dimensions: i32,
    pub dim: *const Dimension,
    pub host: *mut u8,
}

impl RawBuffer {
    /// Describes `dims` and `host` for element type `ty`; borrows both pointers.
    ///
    /// Fails with [`BufferError::InvalidArgument`] when the rank does not fit
    /// the descriptor's `i32` field.
    pub fn describe(ty: ElementType, dims: &[Dimension], host: *mut u8) -> BufferResult<Self> {
        Ok(RawBuffer {
            type_code: ty.code.tag(),
            type_bits: ty.bits,
            type_lanes: ty.lanes,
            dimensions: rank_field(dims.len())?,
            dim: dims_ptr(dims),
            host,
        })
    }

    /// Same descriptor pointing at `dims`, a copy of the described dimensions.
    pub(crate) fn rebind(self, dims: &[Dimension]) -> Self {
        debug_assert_eq!(usize::try_from(self.dimensions).ok(), Some(dims.len()));
        RawBuffer {
            dim: dims_ptr(dims),
            ..self
        }
    }

    /// Rank-zero descriptor without storage.
    pub(crate) fn empty(ty: ElementType) -> Self {
        RawBuffer {
            type_code: ty.code.tag(),
            type_bits: ty.bits,
            type_lanes: ty.lanes,
            dimensions: 0,
            dim: ptr::null(),
            host: ptr::null_mut(),
        }
    }

    /// Element type recorded in the tag fields, if the code is known.
    pub fn element_type(&self) -> Option<ElementType> {
        TypeCode::from_tag(self.type_code)
            .map(|code| ElementType::new(code, self.type_bits, self.type_lanes))
    }

    /// Copies the per-axis descriptors out of the descriptor.
    ///
    /// # Safety
    /// `dim` must point to `dimensions` readable descriptors (or may be null
    /// when `dimensions` is zero).
    pub unsafe fn dims(&self) -> Option<Vec<Dimension>> {
        let rank = usize::try_from(self.dimensions).ok()?;
        if rank == 0 {
            return Some(Vec::new());
        }
        if self.dim.is_null() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(self.dim, rank) }.to_vec())
    }
}

fn rank_field(rank: usize) -> BufferResult<i32> {
    i32::try_from(rank).map_err(|_| {
        BufferError::invalid_argument(format!("rank {rank} does not fit a raw descriptor"))
    })
}

fn dims_ptr(dims: &[Dimension]) -> *const Dimension {
    if dims.is_empty() {
        ptr::null()
    } else {
        dims.as_ptr()
    }
}
