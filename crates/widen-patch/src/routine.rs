//! Routines and their evaluation.
//!
//! A [`Routine`] is an immutable instruction stream plus a local-slot
//! count. Evaluating one runs a small stack machine: arguments are copied
//! into the first locals, `Call` pulls a value from an [`AccessorEnv`],
//! and execution is bounded by a fuel budget.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ExecError;
use crate::instr::{Instruction, Label, Op};

/// Instruction budget for a single evaluation.
pub const DEFAULT_FUEL: usize = 10_000;

/// An instruction stream with its local-slot count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Routine {
    locals: u16,
    body: Vec<Instruction>,
}

impl Routine {
    /// Create a routine from its body.
    pub fn new(locals: u16, body: impl IntoIterator<Item = Instruction>) -> Self {
        Self {
            locals,
            body: body.into_iter().collect(),
        }
    }

    /// Create a routine from bare ops (no labels or blocks).
    pub fn from_ops(locals: u16, ops: impl IntoIterator<Item = Op>) -> Self {
        Self::new(locals, ops.into_iter().map(Instruction::new))
    }

    /// Number of local slots.
    pub fn locals(&self) -> u16 {
        self.locals
    }

    /// The instruction stream.
    pub fn body(&self) -> &[Instruction] {
        &self.body
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Indices of instructions whose op equals `op`.
    pub fn positions_of<'a>(&'a self, op: &'a Op) -> impl Iterator<Item = usize> + 'a {
        self.body
            .iter()
            .enumerate()
            .filter(move |(_, instr)| instr.op == *op)
            .map(|(i, _)| i)
    }

    /// Number of `ldc.i4 value` instructions.
    pub fn count_literal(&self, value: i32) -> usize {
        self.body.iter().filter(|i| i.op.is_literal(value)).count()
    }

    /// Evaluate with the default fuel budget.
    pub fn evaluate(&self, args: &[i64], env: &dyn AccessorEnv) -> Result<i64, ExecError> {
        self.evaluate_with_fuel(args, env, DEFAULT_FUEL)
    }

    /// Evaluate, failing after `fuel` instructions.
    pub fn evaluate_with_fuel(
        &self,
        args: &[i64],
        env: &dyn AccessorEnv,
        fuel: usize,
    ) -> Result<i64, ExecError> {
        if args.len() > self.locals as usize {
            return Err(ExecError::TooManyArguments {
                supplied: args.len(),
                locals: self.locals,
            });
        }
        let targets = self.label_targets()?;
        let mut locals = vec![0i64; self.locals as usize];
        locals[..args.len()].copy_from_slice(args);
        let mut stack: Vec<i64> = Vec::with_capacity(8);

        let mut pc = 0usize;
        for _ in 0..fuel {
            let instr = self.body.get(pc).ok_or(ExecError::MissingReturn)?;
            let mut next = pc + 1;
            match &instr.op {
                Op::Nop => {}
                Op::LdcI4(v) => stack.push(i64::from(*v)),
                Op::LdLoc(slot) => {
                    let value = *locals.get(*slot as usize).ok_or(ExecError::LocalOutOfRange {
                        slot: *slot,
                        locals: self.locals,
                    })?;
                    stack.push(value);
                }
                Op::StLoc(slot) => {
                    let value = pop(&mut stack, pc)?;
                    let local =
                        locals
                            .get_mut(*slot as usize)
                            .ok_or(ExecError::LocalOutOfRange {
                                slot: *slot,
                                locals: self.locals,
                            })?;
                    *local = value;
                }
                Op::Add | Op::Sub | Op::Mul | Op::Shl | Op::Clt => {
                    let b = pop(&mut stack, pc)?;
                    let a = pop(&mut stack, pc)?;
                    stack.push(match &instr.op {
                        Op::Add => a.wrapping_add(b),
                        Op::Sub => a.wrapping_sub(b),
                        Op::Mul => a.wrapping_mul(b),
                        Op::Shl => a.wrapping_shl(b as u32 & 63),
                        _ => i64::from(a < b),
                    });
                }
                Op::Br(label) => next = jump(&targets, *label)?,
                Op::BrTrue(label) => {
                    if pop(&mut stack, pc)? != 0 {
                        next = jump(&targets, *label)?;
                    }
                }
                Op::BrFalse(label) => {
                    if pop(&mut stack, pc)? == 0 {
                        next = jump(&targets, *label)?;
                    }
                }
                Op::Call(name) => {
                    let value = env
                        .resolve(name)
                        .ok_or_else(|| ExecError::UnknownAccessor { name: name.clone() })?;
                    stack.push(value);
                }
                Op::Ret => return pop(&mut stack, pc),
            }
            pc = next;
        }
        Err(ExecError::FuelExhausted)
    }

    fn label_targets(&self) -> Result<HashMap<Label, usize>, ExecError> {
        let mut targets = HashMap::new();
        for (i, instr) in self.body.iter().enumerate() {
            for label in &instr.labels {
                if targets.insert(*label, i).is_some() {
                    return Err(ExecError::DuplicateLabel { label: *label });
                }
            }
        }
        Ok(targets)
    }
}

fn pop(stack: &mut Vec<i64>, pc: usize) -> Result<i64, ExecError> {
    stack.pop().ok_or(ExecError::StackUnderflow { pc })
}

fn jump(targets: &HashMap<Label, usize>, label: Label) -> Result<usize, ExecError> {
    targets
        .get(&label)
        .copied()
        .ok_or(ExecError::UnknownLabel { label })
}

/// Source of values for `Call` instructions.
pub trait AccessorEnv {
    /// Value of the accessor named `name`, or `None` if unknown.
    fn resolve(&self, name: &str) -> Option<i64>;
}

type AccessorFn = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Named zero-argument accessors callable from patched routines.
#[derive(Clone, Default)]
pub struct Accessors {
    entries: IndexMap<String, AccessorFn>,
}

impl Accessors {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an accessor.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        accessor: impl Fn() -> i64 + Send + Sync + 'static,
    ) {
        self.entries.insert(name.into(), Arc::new(accessor));
    }

    /// Whether an accessor with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered accessor names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl AccessorEnv for Accessors {
    fn resolve(&self, name: &str) -> Option<i64> {
        self.entries.get(name).map(|f| f())
    }
}

impl std::fmt::Debug for Accessors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
