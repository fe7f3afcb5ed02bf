//! Array container whose element type and rank are known only at runtime.

use std::fmt;
use std::ptr;

use super::dimension::{self, Dimension};
use super::dtype::{Element, ElementType};
use super::image::Image;
use super::storage::{self, Ownership, Storage};
use crate::error::{BufferError, BufferResult};
use crate::runtime::RawBuffer;

/// Host array with runtime element type and rank, convertible back to a typed
/// [`Image`] through a checked conversion.
///
/// Shape and type never change after construction; a differently shaped array
/// is a new array.
pub struct TypeErasedArray {
    ty: ElementType,
    dims: Box<[Dimension]>,
    storage: Storage,
    ownership: Ownership,
    host: *mut u8,
    size_in_bytes: usize,
    // Points into `dims`, whose heap block never moves.
    raw: RawBuffer,
}

// Metadata is immutable; element access through `host_ptr` is unsynchronised.
unsafe impl Send for TypeErasedArray {}
unsafe impl Sync for TypeErasedArray {}

impl TypeErasedArray {
    /// Allocates a zero-filled array of `ty` with dense strides over `extents`.
    pub fn new(ty: ElementType, extents: &[usize]) -> BufferResult<Self> {
        Self::with_dimensions(ty, dimension::dense(extents)?)
    }

    /// Allocates a zero-filled array with caller-supplied mins and strides.
    pub fn with_dimensions(ty: ElementType, dims: impl Into<Vec<Dimension>>) -> BufferResult<Self> {
        let dims = dims.into();
        dimension::validate(&dims)?;
        let size_in_bytes = storage::addressed_bytes(ty.bytes(), &dims)?;
        let (storage, host) = storage::allocate(ty.bytes(), &dims)?;
        Self::assemble(ty, dims, storage, Ownership::Owned, host, size_in_bytes)
    }

    /// Erases the type and rank of `image`, aliasing its storage without copying.
    pub fn from_image<T: Element, const D: usize>(image: &Image<T, D>) -> BufferResult<Self> {
        let ty = T::TYPE;
        let dims = image.dims().to_vec();
        let size_in_bytes = storage::addressed_bytes(ty.bytes(), &dims)
            .map_err(|err| BufferError::invalid_argument(err.to_string()))?;
        let host: *mut u8 = image.host_ptr().cast();
        let ownership = match image.storage() {
            Storage::Allocated(_) => Ownership::Shared,
            Storage::External => Ownership::External,
            Storage::Unallocated => Ownership::Unallocated,
        };
        Self::assemble(
            ty,
            dims,
            image.storage().clone(),
            ownership,
            host,
            size_in_bytes,
        )
    }

    /// Wraps storage described by an external descriptor without taking ownership.
    ///
    /// # Safety
    /// `raw.dim` must point to `raw.dimensions` readable descriptors, and
    /// `raw.host` (when non-null) must address storage matching them for as long
    /// as the returned array, or any view converted from it, is alive.
    pub unsafe fn from_raw(ty: ElementType, raw: &RawBuffer) -> BufferResult<Self> {
        match raw.element_type() {
            Some(described) if described == ty => {}
            described => {
                return Err(BufferError::invalid_argument(format!(
                    "raw descriptor type {described:?} does not match {ty}"
                )))
            }
        }
        let dims = unsafe { raw.dims() }.ok_or_else(|| {
            BufferError::invalid_argument(format!(
                "raw descriptor with {} dimensions has no dimension array",
                raw.dimensions
            ))
        })?;
        dimension::validate(&dims)?;
        let size_in_bytes = storage::addressed_bytes(ty.bytes(), &dims)
            .map_err(|err| BufferError::invalid_argument(err.to_string()))?;
        let (storage, ownership) = if raw.host.is_null() {
            (Storage::Unallocated, Ownership::Unallocated)
        } else {
            (Storage::External, Ownership::External)
        };
        tracing::debug!(%ty, rank = dims.len(), "wrapping external raw buffer");
        Self::assemble(ty, dims, storage, ownership, raw.host, size_in_bytes)
    }

    fn assemble(
        ty: ElementType,
        dims: Vec<Dimension>,
        storage: Storage,
        ownership: Ownership,
        host: *mut u8,
        size_in_bytes: usize,
    ) -> BufferResult<Self> {
        let dims = dims.into_boxed_slice();
        let raw = RawBuffer::describe(ty, &dims, host)?;
        Ok(TypeErasedArray {
            ty,
            dims,
            storage,
            ownership,
            host,
            size_in_bytes,
            raw,
        })
    }

    /// Recovers a typed view sharing this array's storage.
    ///
    /// Fails with [`BufferError::TypeMismatch`] when `T` is not the stored
    /// element type, then with [`BufferError::RankMismatch`] when `D` is not
    /// the stored rank.
    pub fn as_image<T: Element, const D: usize>(&self) -> BufferResult<Image<T, D>> {
        if self.ty != T::TYPE {
            return Err(BufferError::TypeMismatch {
                expected: T::TYPE,
                actual: self.ty,
            });
        }
        let rank_mismatch = BufferError::RankMismatch {
            expected: D,
            actual: self.dims.len(),
        };
        let dims = <[Dimension; D]>::try_from(&*self.dims).map_err(|_| rank_mismatch)?;
        Ok(unsafe { Image::from_parts(dims, self.storage.clone(), self.host.cast()) })
    }

    pub fn ty(&self) -> ElementType {
        self.ty
    }

    /// Rank of the array.
    pub fn dimensions(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn dim(&self, index: usize) -> BufferResult<Dimension> {
        self.dims
            .get(index)
            .copied()
            .ok_or(BufferError::IndexOutOfRange {
                index,
                rank: self.dims.len(),
            })
    }

    /// Product of the extents times the element size.
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    /// Pointer to the element at the mins; null when undefined.
    pub fn host_ptr(&self) -> *mut u8 {
        self.host
    }

    /// Descriptor for code on the far side of the compiled-code boundary.
    pub fn raw_buffer(&self) -> *const RawBuffer {
        &self.raw
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_defined(&self) -> bool {
        !self.host.is_null()
    }

    /// Bytes held alive by this array, zero unless it owns or shares an allocation.
    pub(crate) fn held_bytes(&self) -> usize {
        self.storage
            .allocation()
            .map(|allocation| allocation.capacity())
            .unwrap_or(0)
    }
}

impl Clone for TypeErasedArray {
    /// Shallow copy: the clone aliases the same storage.
    fn clone(&self) -> Self {
        let dims = self.dims.clone();
        let raw = self.raw.rebind(&dims);
        TypeErasedArray {
            ty: self.ty,
            dims,
            storage: self.storage.clone(),
            ownership: self.ownership,
            host: self.host,
            size_in_bytes: self.size_in_bytes,
            raw,
        }
    }
}

impl Default for TypeErasedArray {
    /// Rank-zero, unallocated `uint8` array.
    fn default() -> Self {
        let ty = ElementType::uint(8);
        TypeErasedArray {
            ty,
            dims: Box::default(),
            storage: Storage::Unallocated,
            ownership: Ownership::Unallocated,
            host: ptr::null_mut(),
            size_in_bytes: 0,
            raw: RawBuffer::empty(ty),
        }
    }
}

impl fmt::Debug for TypeErasedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeErasedArray")
            .field("type", &self.ty)
            .field("dims", &self.dims)
            .field("ownership", &self.ownership)
            .field("host", &self.host)
            .finish()
    }
}

impl<T: Element, const D: usize> TryFrom<&TypeErasedArray> for Image<T, D> {
    type Error = BufferError;

    fn try_from(array: &TypeErasedArray) -> BufferResult<Self> {
        array.as_image()
    }
}
