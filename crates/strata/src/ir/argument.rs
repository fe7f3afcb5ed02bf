//! Metadata an external pipeline binder needs to register a buffer parameter.

use serde::{Deserialize, Serialize};

use crate::host::dtype::ElementType;

/// Role of a parameter in a pipeline signature. Buffers converted from a
/// handle are always inputs; binders declare scalars and outputs themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentKind {
    InputScalar,
    InputBuffer,
    OutputBuffer,
}

/// Named, typed pipeline parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub kind: ArgumentKind,
    pub ty: ElementType,
    /// Rank for buffer arguments, zero for scalars.
    pub dimensions: usize,
}

impl Argument {
    pub fn input_buffer(name: impl Into<String>, ty: ElementType, dimensions: usize) -> Self {
        Argument {
            name: name.into(),
            kind: ArgumentKind::InputBuffer,
            ty,
            dimensions,
        }
    }

    pub fn output_buffer(name: impl Into<String>, ty: ElementType, dimensions: usize) -> Self {
        Argument {
            kind: ArgumentKind::OutputBuffer,
            ..Self::input_buffer(name, ty, dimensions)
        }
    }

    pub fn input_scalar(name: impl Into<String>, ty: ElementType) -> Self {
        Argument {
            name: name.into(),
            kind: ArgumentKind::InputScalar,
            ty,
            dimensions: 0,
        }
    }

    pub fn is_buffer(&self) -> bool {
        matches!(
            self.kind,
            ArgumentKind::InputBuffer | ArgumentKind::OutputBuffer
        )
    }
}
