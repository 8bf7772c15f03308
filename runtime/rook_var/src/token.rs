//! Operand tokens exchanged with the expression evaluator.
//!
//! The evaluator produces tagged operands; this layer only stores and
//! retrieves their values. A token is cheap to clone (strings are shared,
//! objects are reference-counted handles).

use std::rc::Rc;

use crate::arena::VarId;
use crate::object::ObjectRef;

/// An operand supplied by (or returned to) the expression evaluator.
#[derive(Clone, Debug)]
pub enum Token {
    /// An omitted parameter or otherwise absent value.
    Missing,
    /// String operand.
    Str(Rc<str>),
    /// Integer operand.
    Int(i64),
    /// Float operand.
    Float(f64),
    /// Object operand.
    Object(ObjectRef),
    /// A variable operand, to be read through the arena.
    Var(VarId),
}

impl Token {
    /// Convenience constructor for string operands.
    pub fn str(text: impl Into<Rc<str>>) -> Self {
        Token::Str(text.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Token::Missing)
    }
}

impl From<i64> for Token {
    fn from(v: i64) -> Self {
        Token::Int(v)
    }
}

impl From<f64> for Token {
    fn from(v: f64) -> Self {
        Token::Float(v)
    }
}

impl From<&str> for Token {
    fn from(v: &str) -> Self {
        Token::str(v)
    }
}
