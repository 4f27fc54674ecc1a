//! Instruction model for patchable routines.
//!
//! A routine body is a flat list of [`Instruction`]s. Each instruction has
//! an [`Op`] plus the labels that branch instructions target and the
//! exception-block markers that open or close protected regions. Patches
//! rewrite operands or replace instruction ranges; labels and block
//! markers are what they must keep intact.

use std::fmt;

use smallvec::SmallVec;

/// A branch target. Attached to the instruction it marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Boundary marker of an exception-handling region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExceptionBlock {
    /// Start of a protected region.
    BeginTry,
    /// Start of a catch handler.
    BeginCatch,
    /// Start of a finally handler.
    BeginFinally,
    /// End of the innermost open region.
    End,
}

/// Operation of a single instruction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// No operation.
    Nop,
    /// Push a 32-bit integer literal.
    LdcI4(i32),
    /// Push a local slot.
    LdLoc(u16),
    /// Pop into a local slot.
    StLoc(u16),
    /// Pop two, push their sum.
    Add,
    /// Pop two, push `a - b`.
    Sub,
    /// Pop two, push their product.
    Mul,
    /// Pop two, push `a << b`.
    Shl,
    /// Pop two, push 1 if `a < b` else 0.
    Clt,
    /// Unconditional jump.
    Br(Label),
    /// Pop, jump if non-zero.
    BrTrue(Label),
    /// Pop, jump if zero.
    BrFalse(Label),
    /// Push the value of a named zero-argument accessor.
    Call(String),
    /// Return the top of the stack.
    Ret,
}

impl Op {
    /// Whether this is a literal load of `value`.
    pub fn is_literal(&self, value: i32) -> bool {
        matches!(self, Self::LdcI4(v) if *v == value)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => write!(f, "nop"),
            Self::LdcI4(v) => write!(f, "ldc.i4 {v}"),
            Self::LdLoc(n) => write!(f, "ldloc.{n}"),
            Self::StLoc(n) => write!(f, "stloc.{n}"),
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Mul => write!(f, "mul"),
            Self::Shl => write!(f, "shl"),
            Self::Clt => write!(f, "clt"),
            Self::Br(l) => write!(f, "br {l}"),
            Self::BrTrue(l) => write!(f, "brtrue {l}"),
            Self::BrFalse(l) => write!(f, "brfalse {l}"),
            Self::Call(name) => write!(f, "call {name}"),
            Self::Ret => write!(f, "ret"),
        }
    }
}

/// One instruction of a routine body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// The operation.
    pub op: Op,
    /// Labels marking this instruction as a branch target.
    pub labels: SmallVec<[Label; 2]>,
    /// Exception-region markers attached to this instruction.
    pub blocks: SmallVec<[ExceptionBlock; 1]>,
}

impl Instruction {
    /// An instruction with no labels or block markers.
    pub fn new(op: Op) -> Self {
        Self {
            op,
            labels: SmallVec::new(),
            blocks: SmallVec::new(),
        }
    }

    /// Attach a label.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Attach an exception-block marker.
    pub fn with_block(mut self, block: ExceptionBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Whether anything outside the op refers to this instruction.
    pub fn is_anchored(&self) -> bool {
        !self.labels.is_empty() || !self.blocks.is_empty()
    }
}

impl From<Op> for Instruction {
    fn from(op: Op) -> Self {
        Self::new(op)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "{label}: ")?;
        }
        write!(f, "{}", self.op)
    }
}
