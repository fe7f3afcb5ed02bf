//! Interfaces produced for the compiler and pipeline-binding layers.

pub mod argument;
pub mod expr;

pub use argument::{Argument, ArgumentKind};
pub use expr::{BinaryOp, BufferAccess, Expr};
