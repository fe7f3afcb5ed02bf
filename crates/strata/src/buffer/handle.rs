//! Cheap, cloneable handle over shared buffer contents.

use std::fmt;
use std::sync::Arc;

use super::contents::BufferContents;
use crate::error::{BufferError, BufferResult};
use crate::host::{Dimension, Element, ElementType, Image, TypeErasedArray};
use crate::ir::{Argument, Expr};
use crate::runtime::RawBuffer;

/// Named, reference-counted handle on an array of runtime type and rank.
///
/// Cloning shares the contents; it never copies storage. A default handle is
/// undefined. Every accessor other than [`Buffer::defined`], [`Buffer::same_as`],
/// [`Buffer::try_get`], and [`Buffer::ref_count`] requires contents and panics
/// on a default-constructed handle.
#[derive(Clone, Default)]
pub struct Buffer {
    contents: Option<Arc<BufferContents>>,
}

impl Buffer {
    /// Allocates fresh zero-filled storage owned by the new contents record.
    pub fn new(ty: ElementType, extents: &[usize], name: impl Into<String>) -> BufferResult<Self> {
        Ok(Self::from_array(TypeErasedArray::new(ty, extents)?, name))
    }

    /// Allocates fresh storage with caller-supplied mins and strides.
    pub fn with_dimensions(
        ty: ElementType,
        dims: impl Into<Vec<Dimension>>,
        name: impl Into<String>,
    ) -> BufferResult<Self> {
        Ok(Self::from_array(
            TypeErasedArray::with_dimensions(ty, dims)?,
            name,
        ))
    }

    /// Wraps a typed view without copying its storage.
    ///
    /// Fails with [`BufferError::InvalidArgument`] when the view has no storage
    /// but declares a non-empty extent.
    pub fn from_image<T: Element, const D: usize>(
        image: &Image<T, D>,
        name: impl Into<String>,
    ) -> BufferResult<Self> {
        if !image.is_defined() && image.dims().iter().any(|dim| dim.extent != 0) {
            return Err(BufferError::invalid_argument(format!(
                "image of {} with extents {:?} has no storage",
                T::TYPE,
                image.dims().map(|dim| dim.extent)
            )));
        }
        Ok(Self::from_array(TypeErasedArray::from_image(image)?, name))
    }

    /// Wraps an already-built array.
    pub fn from_array(array: TypeErasedArray, name: impl Into<String>) -> Self {
        Buffer {
            contents: Some(Arc::new(BufferContents::new(array, name))),
        }
    }

    /// Wraps an externally populated raw descriptor as-is. The handle never
    /// frees the described storage.
    ///
    /// # Safety
    /// Same contract as [`TypeErasedArray::from_raw`]: the descriptor's
    /// dimension array must be readable and its host storage must outlive the
    /// handle and every clone or view derived from it.
    pub unsafe fn from_raw(
        ty: ElementType,
        raw: &RawBuffer,
        name: impl Into<String>,
    ) -> BufferResult<Self> {
        let array = unsafe { TypeErasedArray::from_raw(ty, raw)? };
        Ok(Self::from_array(array, name))
    }

    /// Identity comparison: true iff both handles share one contents record.
    /// Two undefined handles compare as the same.
    pub fn same_as(&self, other: &Buffer) -> bool {
        match (&self.contents, &other.contents) {
            (Some(lhs), Some(rhs)) => Arc::ptr_eq(lhs, rhs),
            (None, None) => true,
            _ => false,
        }
    }

    /// True when the handle has contents whose storage pointer is non-null.
    pub fn defined(&self) -> bool {
        self.contents
            .as_ref()
            .is_some_and(|contents| contents.array().is_defined())
    }

    /// Borrows the underlying array.
    ///
    /// # Panics
    /// On a default-constructed handle.
    pub fn get(&self) -> &TypeErasedArray {
        self.contents().array()
    }

    pub fn try_get(&self) -> Option<&TypeErasedArray> {
        self.contents.as_deref().map(BufferContents::array)
    }

    /// Debug name of the buffer.
    pub fn name(&self) -> &str {
        self.contents().name()
    }

    pub fn ty(&self) -> ElementType {
        self.get().ty()
    }

    /// Rank of the buffer.
    pub fn dimensions(&self) -> usize {
        self.get().dimensions()
    }

    pub fn dim(&self, index: usize) -> BufferResult<Dimension> {
        self.get().dim(index)
    }

    pub fn min(&self, index: usize) -> BufferResult<i64> {
        self.dim(index).map(|dim| dim.min)
    }

    pub fn extent(&self, index: usize) -> BufferResult<i64> {
        self.dim(index).map(|dim| dim.extent)
    }

    pub fn stride(&self, index: usize) -> BufferResult<i64> {
        self.dim(index).map(|dim| dim.stride)
    }

    pub fn size_in_bytes(&self) -> usize {
        self.get().size_in_bytes()
    }

    pub fn raw_buffer(&self) -> *const RawBuffer {
        self.get().raw_buffer()
    }

    pub fn host_ptr(&self) -> *mut u8 {
        self.get().host_ptr()
    }

    /// Converts to a typed view with runtime type and rank checks.
    pub fn as_image<T: Element, const D: usize>(&self) -> BufferResult<Image<T, D>> {
        self.get().as_image()
    }

    /// Describes this buffer as an input parameter for a pipeline binder.
    pub fn to_argument(&self) -> Argument {
        Argument::input_buffer(self.name(), self.ty(), self.dimensions())
    }

    /// Builds a symbolic access to this buffer at `coords`.
    ///
    /// The coordinate count is deliberately not compared to the rank; the
    /// consuming compiler validates arity when it lowers the access.
    pub fn at<I, E>(&self, coords: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Expr::access(self.name(), self.ty(), coords)
    }

    /// Number of handles sharing the contents; zero for an undefined handle.
    pub fn ref_count(&self) -> usize {
        self.contents.as_ref().map_or(0, Arc::strong_count)
    }

    fn contents(&self) -> &BufferContents {
        self.contents
            .as_deref()
            .expect("accessed an undefined Buffer; check defined() first")
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.contents.as_deref() {
            None => f.write_str("Buffer(undefined)"),
            Some(contents) => {
                let array = contents.array();
                f.debug_struct("Buffer")
                    .field("name", &contents.name())
                    .field("type", &format_args!("{}", array.ty()))
                    .field(
                        "extents",
                        &array.dims().iter().map(|dim| dim.extent).collect::<Vec<_>>(),
                    )
                    .field("ownership", &array.ownership())
                    .finish()
            }
        }
    }
}

impl<T: Element, const D: usize> TryFrom<&Image<T, D>> for Buffer {
    type Error = BufferError;

    fn try_from(image: &Image<T, D>) -> BufferResult<Self> {
        Buffer::from_image(image, "")
    }
}

impl<T: Element, const D: usize> TryFrom<&Buffer> for Image<T, D> {
    type Error = BufferError;

    fn try_from(buffer: &Buffer) -> BufferResult<Self> {
        buffer.as_image()
    }
}

impl From<&Buffer> for Argument {
    fn from(buffer: &Buffer) -> Self {
        buffer.to_argument()
    }
}

/// Indexes a typed view symbolically by wrapping it in a fresh, auto-named
/// [`Buffer`].
pub fn image_accessor<T, const D: usize, I, E>(image: &Image<T, D>, coords: I) -> BufferResult<Expr>
where
    T: Element,
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    Ok(Buffer::from_image(image, "")?.at(coords))
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    #[test]
    fn default_handle_is_undefined() {
        let buffer = Buffer::default();
        assert!(!buffer.defined());
        assert!(buffer.try_get().is_none());
        assert_eq!(buffer.ref_count(), 0);
        assert!(buffer.same_as(&Buffer::default()));
    }

    #[test]
    #[should_panic(expected = "undefined Buffer")]
    fn accessing_undefined_handle_panics() {
        let _ = Buffer::default().name();
    }

    #[test]
    fn clones_share_contents() {
        let buffer = Buffer::new(ElementType::uint(8), &[16], "bytes").unwrap();
        let copy = buffer.clone();
        assert_eq!(buffer.ref_count(), 2);
        assert!(copy.same_as(&buffer));
        drop(copy);
        assert_eq!(buffer.ref_count(), 1);
    }

    #[test]
    fn concurrent_clone_and_drop_releases_once() {
        const THREADS: usize = 8;
        const CLONES: usize = 200;

        let buffer = Buffer::new(ElementType::float(32), &[64, 64], "shared").unwrap();
        let weak = Arc::downgrade(buffer.contents.as_ref().unwrap());
        let host = buffer.host_ptr() as usize;
        let barrier = Arc::new(Barrier::new(THREADS));

        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let handle = buffer.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..CLONES {
                        let copies: Vec<Buffer> = (0..4).map(|_| handle.clone()).collect();
                        for copy in &copies {
                            assert_eq!(copy.host_ptr() as usize, host);
                            assert!(copy.same_as(&handle));
                        }
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(buffer.ref_count(), 1);
        assert!(weak.upgrade().is_some());
        drop(buffer);
        assert!(weak.upgrade().is_none());
    }
}
