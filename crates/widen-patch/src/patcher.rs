//! Literal substitution and mid-routine splicing.
//!
//! Both rewrites are pure: they take a routine and return a new one, or
//! an error if the routine does not look the way the patch expects. The
//! input is never modified, so a failed rewrite leaves nothing to undo.

use crate::error::PatchError;
use crate::instr::{Instruction, Op};
use crate::routine::Routine;
use crate::target::PatchKind;

/// Stateless rewriter for [`PatchKind`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstantPatcher;

impl ConstantPatcher {
    /// Replace the single `ldc.i4 original` in `routine` with `replacement`.
    ///
    /// Everything else, labels and exception blocks included, is copied
    /// unchanged.
    pub fn replace_literal(
        &self,
        routine: &Routine,
        original: i32,
        replacement: i32,
    ) -> Result<Routine, PatchError> {
        let needle = Op::LdcI4(original);
        let mut hits = routine.positions_of(&needle);
        let index = hits.next().ok_or(PatchError::TargetNotFound { literal: original })?;
        let extra = hits.count();
        if extra > 0 {
            return Err(PatchError::AmbiguousTarget {
                literal: original,
                occurrences: extra + 1,
            });
        }
        let mut body = routine.body().to_vec();
        body[index].op = Op::LdcI4(replacement);
        Ok(Routine::new(routine.locals(), body))
    }

    /// Replace `[start, end)` with a single `call accessor`.
    ///
    /// Each anchor must occur exactly once, `start` before `end`. The
    /// start anchor's labels and block markers move to the call. The
    /// instructions between the anchors are dropped, so none of them may
    /// carry a label or block marker.
    pub fn splice(
        &self,
        routine: &Routine,
        start: &Op,
        end: &Op,
        accessor: &str,
    ) -> Result<Routine, PatchError> {
        let start_at = unique(routine, start)?;
        let end_at = unique(routine, end)?;
        if end_at <= start_at {
            return Err(PatchError::AnchorOrder {
                start: start_at,
                end: end_at,
            });
        }
        let body = routine.body();
        for (offset, instr) in body[start_at + 1..end_at].iter().enumerate() {
            if instr.is_anchored() {
                return Err(PatchError::DanglingLabel {
                    index: start_at + 1 + offset,
                    labels: instr.labels.to_vec(),
                });
            }
        }

        let anchor = &body[start_at];
        let call = Instruction {
            op: Op::Call(accessor.to_owned()),
            labels: anchor.labels.clone(),
            blocks: anchor.blocks.clone(),
        };
        let mut out = Vec::with_capacity(body.len() - (end_at - start_at) + 1);
        out.extend_from_slice(&body[..start_at]);
        out.push(call);
        out.extend_from_slice(&body[end_at..]);
        Ok(Routine::new(routine.locals(), out))
    }

    /// Apply `kind` to `routine`. Literal patches write `replacement`.
    pub fn apply(
        &self,
        routine: &Routine,
        kind: &PatchKind,
        replacement: i32,
    ) -> Result<Routine, PatchError> {
        match kind {
            PatchKind::Literal { original } => self.replace_literal(routine, *original, replacement),
            PatchKind::Splice {
                start,
                end,
                accessor,
            } => self.splice(routine, start, end, accessor),
        }
    }
}

fn unique(routine: &Routine, anchor: &Op) -> Result<usize, PatchError> {
    let hits: Vec<usize> = routine.positions_of(anchor).collect();
    match hits.as_slice() {
        [index] => Ok(*index),
        _ => Err(PatchError::AnchorNotFound {
            anchor: anchor.clone(),
            occurrences: hits.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{ExceptionBlock, Label};
    use crate::routine::Accessors;

    const CAP: i32 = 262_144;

    fn awake() -> Routine {
        Routine::new(
            1,
            vec![
                Instruction::new(Op::LdcI4(CAP)).with_block(ExceptionBlock::BeginTry),
                Instruction::new(Op::StLoc(0)),
                Instruction::new(Op::LdLoc(0)).with_label(Label(0)),
                Instruction::new(Op::Ret).with_block(ExceptionBlock::End),
            ],
        )
    }

    // Mirrors the host's size computation: local1 = 4096 << 6; local2 = local1.
    fn deserialize() -> Routine {
        Routine::new(
            3,
            vec![
                Instruction::new(Op::Nop).with_label(Label(7)),
                Instruction::new(Op::LdcI4(4096)).with_label(Label(1)),
                Instruction::new(Op::LdcI4(6)),
                Instruction::new(Op::Shl),
                Instruction::new(Op::StLoc(2)),
                Instruction::new(Op::LdLoc(2)),
                Instruction::new(Op::Ret),
            ],
        )
    }

    #[test]
    fn literal_rewrite_changes_only_operand() {
        let before = awake();
        let after = ConstantPatcher.replace_literal(&before, CAP, 2 * CAP).unwrap();
        assert_eq!(after.len(), before.len());
        assert_eq!(after.locals(), before.locals());
        assert_eq!(after.body()[0].op, Op::LdcI4(2 * CAP));
        assert_eq!(after.body()[0].blocks, before.body()[0].blocks);
        assert_eq!(after.body()[1..], before.body()[1..]);
        assert_eq!(after.evaluate(&[], &Accessors::new()), Ok(2 * CAP as i64));
    }

    #[test]
    fn missing_literal_is_target_not_found() {
        assert_eq!(
            ConstantPatcher.replace_literal(&awake(), 5, 10),
            Err(PatchError::TargetNotFound { literal: 5 })
        );
    }

    #[test]
    fn repeated_literal_is_ambiguous() {
        let r = Routine::from_ops(0, [Op::LdcI4(CAP), Op::LdcI4(CAP), Op::Add, Op::Ret]);
        assert_eq!(
            ConstantPatcher.replace_literal(&r, CAP, 1),
            Err(PatchError::AmbiguousTarget {
                literal: CAP,
                occurrences: 2
            })
        );
    }

    #[test]
    fn splice_replaces_range_and_keeps_anchor_labels() {
        let before = deserialize();
        let after = ConstantPatcher
            .splice(&before, &Op::LdcI4(4096), &Op::StLoc(2), "size")
            .unwrap();
        assert_eq!(after.len(), 5);
        assert_eq!(after.body()[0], before.body()[0]);
        assert_eq!(after.body()[1].op, Op::Call("size".into()));
        assert_eq!(after.body()[1].labels.as_slice(), &[Label(1)]);
        assert_eq!(after.body()[2..], before.body()[4..]);

        let mut env = Accessors::new();
        env.register("size", || 524_288);
        assert_eq!(before.evaluate(&[], &env), Ok(262_144));
        assert_eq!(after.evaluate(&[], &env), Ok(524_288));
    }

    #[test]
    fn splice_requires_unique_ordered_anchors() {
        let r = deserialize();
        assert_eq!(
            ConstantPatcher.splice(&r, &Op::LdcI4(1), &Op::StLoc(2), "size"),
            Err(PatchError::AnchorNotFound {
                anchor: Op::LdcI4(1),
                occurrences: 0
            })
        );
        assert_eq!(
            ConstantPatcher.splice(&r, &Op::StLoc(2), &Op::LdcI4(4096), "size"),
            Err(PatchError::AnchorOrder { start: 4, end: 1 })
        );
        let dup = Routine::from_ops(0, [Op::Nop, Op::Nop, Op::Ret]);
        assert!(matches!(
            ConstantPatcher.splice(&dup, &Op::Nop, &Op::Ret, "size"),
            Err(PatchError::AnchorNotFound { occurrences: 2, .. })
        ));
    }

    #[test]
    fn splice_refuses_to_drop_labelled_code() {
        let r = Routine::new(
            0,
            vec![
                Instruction::new(Op::LdcI4(1)),
                Instruction::new(Op::Nop).with_label(Label(3)),
                Instruction::new(Op::Ret),
            ],
        );
        assert_eq!(
            ConstantPatcher.splice(&r, &Op::LdcI4(1), &Op::Ret, "size"),
            Err(PatchError::DanglingLabel {
                index: 1,
                labels: vec![Label(3)]
            })
        );
    }

    #[test]
    fn apply_dispatches_on_kind() {
        let r = ConstantPatcher
            .apply(&awake(), &PatchKind::Literal { original: CAP }, 7)
            .unwrap();
        assert_eq!(r.count_literal(7), 1);
        let kind = PatchKind::Splice {
            start: Op::LdcI4(4096),
            end: Op::StLoc(2),
            accessor: "size".into(),
        };
        let r = ConstantPatcher.apply(&deserialize(), &kind, 0).unwrap();
        assert_eq!(r.positions_of(&Op::Call("size".into())).count(), 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn literal_rewrite_preserves_everything_else(
                prefix in proptest::collection::vec(0i32..100, 0..8),
                suffix in proptest::collection::vec(0i32..100, 0..8),
                replacement in any::<i32>(),
            ) {
                let ops: Vec<Op> = prefix.iter().map(|v| Op::LdcI4(*v))
                    .chain(std::iter::once(Op::LdcI4(CAP)))
                    .chain(suffix.iter().map(|v| Op::LdcI4(*v)))
                    .chain(std::iter::once(Op::Ret))
                    .collect();
                let before = Routine::from_ops(0, ops);
                let after = ConstantPatcher.replace_literal(&before, CAP, replacement).unwrap();
                prop_assert_eq!(after.len(), before.len());
                let changed = before.body().iter().zip(after.body())
                    .filter(|(a, b)| a != b)
                    .count();
                prop_assert!(changed <= 1);
                prop_assert_eq!(&after.body()[prefix.len()].op, &Op::LdcI4(replacement));
            }
        }
    }
}
