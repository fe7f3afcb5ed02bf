//! Runtime element type tags and the compile-time mapping from Rust scalars.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar kind of a buffer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
    /// Opaque pointer-sized value.
    Handle,
}

impl TypeCode {
    /// Stable tag used by the raw descriptor.
    pub fn tag(self) -> u8 {
        match self {
            TypeCode::Int => 0,
            TypeCode::UInt => 1,
            TypeCode::Float => 2,
            TypeCode::Handle => 3,
        }
    }

    /// Reconstructs a `TypeCode` from its raw descriptor tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(TypeCode::Int),
            1 => Some(TypeCode::UInt),
            2 => Some(TypeCode::Float),
            3 => Some(TypeCode::Handle),
            _ => None,
        }
    }
}

/// Element type of a buffer: kind, bit width, and vector lane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementType {
    pub code: TypeCode,
    pub bits: u8,
    pub lanes: u16,
}

impl ElementType {
    pub const fn new(code: TypeCode, bits: u8, lanes: u16) -> Self {
        ElementType { code, bits, lanes }
    }

    pub const fn int(bits: u8) -> Self {
        Self::new(TypeCode::Int, bits, 1)
    }

    pub const fn uint(bits: u8) -> Self {
        Self::new(TypeCode::UInt, bits, 1)
    }

    pub const fn float(bits: u8) -> Self {
        Self::new(TypeCode::Float, bits, 1)
    }

    pub const fn bool() -> Self {
        Self::uint(1)
    }

    pub const fn handle() -> Self {
        Self::new(TypeCode::Handle, 64, 1)
    }

    /// Returns the same scalar kind widened to `lanes` vector lanes.
    pub const fn with_lanes(self, lanes: u16) -> Self {
        Self::new(self.code, self.bits, lanes)
    }

    /// Storage bytes per element, rounding sub-byte widths up to a whole byte.
    pub fn bytes(self) -> usize {
        (usize::from(self.bits) + 7) / 8 * usize::from(self.lanes)
    }

    pub fn is_float(self) -> bool {
        self.code == TypeCode::Float
    }

    pub fn is_int(self) -> bool {
        self.code == TypeCode::Int
    }

    pub fn is_uint(self) -> bool {
        self.code == TypeCode::UInt
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.code {
            TypeCode::Int => "int",
            TypeCode::UInt => "uint",
            TypeCode::Float => "float",
            TypeCode::Handle => "handle",
        };
        write!(f, "{kind}{}", self.bits)?;
        if self.lanes > 1 {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}

/// Rust scalar types that can back a typed buffer view.
///
/// # Safety
/// `TYPE.bytes()` must equal `size_of::<Self>()`, the alignment of `Self` must
/// not exceed the host allocation alignment, and every bit pattern a buffer of
/// `TYPE` can hold must be a valid `Self`. Typed views read and write storage
/// relying on all three.
pub unsafe trait Element: Copy + Send + Sync + 'static {
    const TYPE: ElementType;
}

macro_rules! impl_element {
    ($($ty:ty => $elem:expr),* $(,)?) => {
        $(
            unsafe impl Element for $ty {
                const TYPE: ElementType = $elem;
            }
        )*
    };
}

impl_element! {
    i8 => ElementType::int(8),
    i16 => ElementType::int(16),
    i32 => ElementType::int(32),
    i64 => ElementType::int(64),
    u8 => ElementType::uint(8),
    u16 => ElementType::uint(16),
    u32 => ElementType::uint(32),
    u64 => ElementType::uint(64),
    bool => ElementType::bool(),
    half::f16 => ElementType::float(16),
    f32 => ElementType::float(32),
    f64 => ElementType::float(64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    use crate::host::storage::HOST_ALIGNMENT;

    #[test]
    fn element_sizes_match_rust_layout() {
        fn check<T: Element>() {
            assert_eq!(T::TYPE.bytes(), size_of::<T>(), "{}", T::TYPE);
            assert!(align_of::<T>() <= HOST_ALIGNMENT, "{}", T::TYPE);
            assert_eq!(T::TYPE.lanes, 1, "{}", T::TYPE);
        }
        check::<i8>();
        check::<i16>();
        check::<i32>();
        check::<i64>();
        check::<u8>();
        check::<u16>();
        check::<u32>();
        check::<u64>();
        check::<bool>();
        check::<half::f16>();
        check::<f32>();
        check::<f64>();
    }

    #[test]
    fn vector_lanes_scale_bytes() {
        assert_eq!(ElementType::float(32).with_lanes(4).bytes(), 16);
        assert_eq!(ElementType::bool().with_lanes(8).bytes(), 8);
    }

    #[test]
    fn display_names() {
        assert_eq!(ElementType::int(32).to_string(), "int32");
        assert_eq!(ElementType::uint(1).to_string(), "uint1");
        assert_eq!(ElementType::float(16).with_lanes(8).to_string(), "float16x8");
        assert_eq!(ElementType::handle().to_string(), "handle64");
    }

    #[test]
    fn type_code_tags_are_stable() {
        for code in [TypeCode::Int, TypeCode::UInt, TypeCode::Float, TypeCode::Handle] {
            assert_eq!(TypeCode::from_tag(code.tag()), Some(code));
        }
        assert_eq!(TypeCode::from_tag(9), None);
    }
}
