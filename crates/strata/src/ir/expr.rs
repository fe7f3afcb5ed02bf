//! Minimal symbolic expressions: enough to name coordinates and buffer accesses.
//!
//! Validation, simplification, and lowering belong to the consuming compiler;
//! nodes built here are plain data.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::host::dtype::ElementType;

/// Arithmetic combinators available for coordinate expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
        }
    }
}

/// Symbolic expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    IntImm {
        ty: ElementType,
        value: i64,
    },
    Var {
        name: String,
        ty: ElementType,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Load from a named buffer at the given coordinates.
    Access(Box<BufferAccess>),
}

/// Access to a buffer site, referring to the buffer by name and element type
/// only, so consumers resolve it independently of any handle's lifetime.
///
/// The number of coordinates is not checked against the buffer's rank here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferAccess {
    pub name: String,
    pub ty: ElementType,
    pub args: SmallVec<[Expr; 4]>,
}

impl BufferAccess {
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl Expr {
    /// 32-bit integer immediate.
    pub fn int(value: i32) -> Self {
        Expr::IntImm {
            ty: ElementType::int(32),
            value: i64::from(value),
        }
    }

    /// 32-bit integer variable.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var {
            name: name.into(),
            ty: ElementType::int(32),
        }
    }

    pub fn binary(op: BinaryOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        }
    }

    /// Access node for buffer `name` of element type `ty` at `args`.
    pub fn access<I, E>(name: impl Into<String>, ty: ElementType, args: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Expr::Access(Box::new(BufferAccess {
            name: name.into(),
            ty,
            args: args.into_iter().map(Into::into).collect(),
        }))
    }

    /// Result type of the expression; binary nodes take their left operand's type.
    pub fn ty(&self) -> ElementType {
        match self {
            Expr::IntImm { ty, .. } | Expr::Var { ty, .. } => *ty,
            Expr::Binary { lhs, .. } => lhs.ty(),
            Expr::Access(access) => access.ty,
        }
    }

    pub fn as_access(&self) -> Option<&BufferAccess> {
        match self {
            Expr::Access(access) => Some(access.as_ref()),
            _ => None,
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_str(src: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(src)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::int(value)
    }
}

impl From<&Expr> for Expr {
    fn from(expr: &Expr) -> Self {
        expr.clone()
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::var(name)
    }
}

macro_rules! impl_binary_operator {
    ($($trait:ident :: $method:ident => $op:expr),* $(,)?) => {
        $(
            impl<R: Into<Expr>> $trait<R> for Expr {
                type Output = Expr;

                fn $method(self, rhs: R) -> Expr {
                    Expr::binary($op, self, rhs)
                }
            }
        )*
    };
}

impl_binary_operator! {
    Add::add => BinaryOp::Add,
    Sub::sub => BinaryOp::Sub,
    Mul::mul => BinaryOp::Mul,
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::IntImm { value, .. } => write!(f, "{value}"),
            Expr::Var { name, .. } => f.write_str(name),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Access(access) => {
                write!(f, "{}(", access.name)?;
                for (index, arg) in access.args.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}
