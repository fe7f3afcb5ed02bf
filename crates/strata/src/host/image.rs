//! Strongly typed, dimensioned view over host storage.

use std::fmt;
use std::marker::PhantomData;
use std::ptr;

use super::dimension::{self, Dimension};
use super::dtype::{Element, ElementType};
use super::storage::{self, Storage};
use crate::error::{BufferError, BufferResult};

/// Typed window of element type `T` and rank `D` over host storage.
///
/// Cloning an image is shallow: both clones address the same bytes, as do all
/// images converted from one buffer. Reads are safe; writes go through the
/// `unsafe` [`Image::set`], whose caller rules out concurrent access through
/// aliasing images.
#[derive(Clone)]
pub struct Image<T: Element, const D: usize> {
    dims: [Dimension; D],
    storage: Storage,
    host: *mut T,
    _marker: PhantomData<T>,
}

// Metadata is immutable and the only element write is `unsafe`.
unsafe impl<T: Element, const D: usize> Send for Image<T, D> {}
unsafe impl<T: Element, const D: usize> Sync for Image<T, D> {}

impl<T: Element, const D: usize> Image<T, D> {
    /// Allocates a zero-filled image with dense strides.
    pub fn new(extents: [usize; D]) -> BufferResult<Self> {
        Self::with_dimensions(dense_array(&extents)?)
    }

    /// Allocates a zero-filled image with caller-supplied mins and strides.
    pub fn with_dimensions(dims: [Dimension; D]) -> BufferResult<Self> {
        dimension::validate(&dims)?;
        let (storage, host) = storage::allocate(T::TYPE.bytes(), &dims)?;
        Ok(Image {
            dims,
            storage,
            host: host.cast(),
            _marker: PhantomData,
        })
    }

    /// Copies `data`, laid out with axis 0 innermost, into a fresh dense image.
    pub fn from_vec(extents: [usize; D], data: Vec<T>) -> BufferResult<Self> {
        let image = Self::new(extents)?;
        let expected = image.element_count();
        if data.len() != expected {
            return Err(BufferError::invalid_argument(format!(
                "image data length ({}) does not match extents {extents:?}",
                data.len()
            )));
        }
        unsafe { ptr::copy_nonoverlapping(data.as_ptr(), image.host, expected) };
        Ok(image)
    }

    /// Describes a dense shape without allocating storage for it.
    pub fn unallocated(extents: [usize; D]) -> BufferResult<Self> {
        Ok(Image {
            dims: dense_array(&extents)?,
            storage: Storage::Unallocated,
            host: ptr::null_mut(),
            _marker: PhantomData,
        })
    }

    /// Reassembles an image from checked container parts.
    ///
    /// # Safety
    /// `host` must address storage of `T` laid out as `dims` describes and stay
    /// valid as long as `storage` (or, for external storage, its producer) does.
    pub(crate) unsafe fn from_parts(dims: [Dimension; D], storage: Storage, host: *mut T) -> Self {
        Image {
            dims,
            storage,
            host,
            _marker: PhantomData,
        }
    }

    pub fn dims(&self) -> &[Dimension; D] {
        &self.dims
    }

    pub fn dim(&self, index: usize) -> BufferResult<Dimension> {
        self.dims
            .get(index)
            .copied()
            .ok_or(BufferError::IndexOutOfRange { index, rank: D })
    }

    pub fn element_type(&self) -> ElementType {
        T::TYPE
    }

    pub fn rank(&self) -> usize {
        D
    }

    /// Pointer to the element at the mins; null when unallocated.
    pub fn host_ptr(&self) -> *mut T {
        self.host
    }

    pub fn is_defined(&self) -> bool {
        !self.host.is_null()
    }

    /// Total number of addressed elements.
    pub fn element_count(&self) -> usize {
        dimension::element_count(&self.dims).unwrap_or(0)
    }

    /// Reads the element at `coords`, or `None` when out of bounds or unallocated.
    pub fn get(&self, coords: [i64; D]) -> Option<T> {
        let offset = self.offset(&coords)?;
        Some(unsafe { self.host.offset(offset).read() })
    }

    /// Writes `value` at `coords`.
    ///
    /// # Safety
    /// No other image, array or raw pointer aliasing this storage may read or
    /// write the same element while the write happens. Clones of this image
    /// and views converted from the same buffer all alias it.
    pub unsafe fn set(&mut self, coords: [i64; D], value: T) -> BufferResult<()> {
        let offset = self.offset(&coords).ok_or_else(|| {
            BufferError::invalid_argument(format!(
                "coordinates {coords:?} are outside the image or it has no storage"
            ))
        })?;
        unsafe { self.host.offset(offset).write(value) };
        Ok(())
    }

    /// Collects every element with axis 0 varying fastest.
    pub fn to_vec(&self) -> Vec<T> {
        let count = self.element_count();
        if !self.is_defined() || count == 0 {
            return Vec::new();
        }
        let mut values = Vec::with_capacity(count);
        let mut coords = self.dims.map(|dim| dim.min);
        for _ in 0..count {
            if let Some(value) = self.get(coords) {
                values.push(value);
            }
            for (coord, dim) in coords.iter_mut().zip(&self.dims) {
                *coord += 1;
                if *coord <= dim.max() {
                    break;
                }
                *coord = dim.min;
            }
        }
        values
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    fn offset(&self, coords: &[i64; D]) -> Option<isize> {
        if self.host.is_null() {
            return None;
        }
        let offset = dimension::offset_of(&self.dims, coords)?;
        isize::try_from(offset).ok()
    }
}

impl<T: Element, const D: usize> Default for Image<T, D> {
    /// An undefined image: zero extents and no storage.
    fn default() -> Self {
        Image {
            dims: [Dimension::default(); D],
            storage: Storage::Unallocated,
            host: ptr::null_mut(),
            _marker: PhantomData,
        }
    }
}

impl<T: Element, const D: usize> fmt::Debug for Image<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("type", &T::TYPE)
            .field("dims", &self.dims)
            .field("host", &self.host)
            .finish()
    }
}

fn dense_array<const D: usize>(extents: &[usize; D]) -> BufferResult<[Dimension; D]> {
    let dims = dimension::dense(extents)?;
    let mut out = [Dimension::default(); D];
    out.copy_from_slice(&dims);
    Ok(out)
}
