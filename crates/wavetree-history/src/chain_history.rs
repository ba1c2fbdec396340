//! `ChainHistory`: an append-only, capacity-bounded log of wavetree edits,
//! replayable against a fresh `OrderedMultisetIntDouble` without the
//! original `Wavetree` (ported from `wavetree/chain_history.c`).
//!
//! Slot 0 is always a synthetic `Initialise` record carrying a clone of
//! the seed `S_v` plus the initial likelihood/temperature/hierarchical
//! scalars; every subsequent slot is a tagged edit record applied to a
//! running copy of `S_v` the same way a live `Wavetree` would apply it.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use wavetree_core::{bad_arg, format_error, full, BinaryReader, BinaryWriter, OrderedMultisetIntDouble, ReadOutcome, Result};
use std::io::{Read, Write};

/// Which kind of edit a [`ChainStep`] records.
///
/// `Initialise` and `PtExchange` are carried as variants for type parity
/// with the source's single `chain_history_step_t` tag space, but neither
/// is ever legal as a *replayed* step: `Initialise` only ever describes
/// slot 0 (handled by [`ChainHistory::initialise`], not [`ChainHistory::add_step`]),
/// and `PtExchange` mutates a caller-owned temperature ladder outside
/// this crate's scope — both route through `do_step` straight to a
/// bad-argument error, matching the source's own `ERROR("...
/// unimplemented")` refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainStepKind {
    Initialise,
    Birth,
    Death,
    Value,
    Move,
    Hierarchical,
    PtExchange,
    Hyper,
}

/// Scalars common to every record, independent of `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepHeader {
    pub kind: ChainStepKind,
    pub accepted: bool,
    pub likelihood: f64,
    pub temperature: f64,
    pub hierarchical: f64,
}

/// The kind-specific payload of a [`ChainStep`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StepPayload {
    Birth {
        depth: u32,
        index: i32,
        new_value: f64,
    },
    Death {
        depth: u32,
        index: i32,
        old_value: f64,
    },
    Value {
        depth: u32,
        index: i32,
        old_value: f64,
        new_value: f64,
    },
    Move {
        depth: u32,
        index: i32,
        new_index: i32,
        old_value: f64,
        new_value: f64,
    },
    Hierarchical {
        old_value: f64,
        new_value: f64,
    },
    PtExchange {
        old_temperature: f64,
    },
    Hyper {
        index: i32,
        old_value: f64,
        new_value: f64,
    },
}

/// One recorded edit: a header plus its matching payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainStep {
    pub header: StepHeader,
    pub payload: StepPayload,
}

impl ChainStep {
    #[must_use]
    pub const fn birth(
        accepted: bool,
        likelihood: f64,
        temperature: f64,
        hierarchical: f64,
        depth: u32,
        index: i32,
        new_value: f64,
    ) -> Self {
        Self {
            header: StepHeader {
                kind: ChainStepKind::Birth,
                accepted,
                likelihood,
                temperature,
                hierarchical,
            },
            payload: StepPayload::Birth { depth, index, new_value },
        }
    }

    #[must_use]
    pub const fn death(
        accepted: bool,
        likelihood: f64,
        temperature: f64,
        hierarchical: f64,
        depth: u32,
        index: i32,
        old_value: f64,
    ) -> Self {
        Self {
            header: StepHeader {
                kind: ChainStepKind::Death,
                accepted,
                likelihood,
                temperature,
                hierarchical,
            },
            payload: StepPayload::Death { depth, index, old_value },
        }
    }

    #[must_use]
    pub const fn value(
        accepted: bool,
        likelihood: f64,
        temperature: f64,
        hierarchical: f64,
        depth: u32,
        index: i32,
        old_value: f64,
        new_value: f64,
    ) -> Self {
        Self {
            header: StepHeader {
                kind: ChainStepKind::Value,
                accepted,
                likelihood,
                temperature,
                hierarchical,
            },
            payload: StepPayload::Value {
                depth,
                index,
                old_value,
                new_value,
            },
        }
    }

    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn mv(
        accepted: bool,
        likelihood: f64,
        temperature: f64,
        hierarchical: f64,
        depth: u32,
        index: i32,
        new_index: i32,
        old_value: f64,
        new_value: f64,
    ) -> Self {
        Self {
            header: StepHeader {
                kind: ChainStepKind::Move,
                accepted,
                likelihood,
                temperature,
                hierarchical,
            },
            payload: StepPayload::Move {
                depth,
                index,
                new_index,
                old_value,
                new_value,
            },
        }
    }

    #[must_use]
    pub const fn hierarchical(
        accepted: bool,
        likelihood: f64,
        temperature: f64,
        hierarchical: f64,
        old_value: f64,
        new_value: f64,
    ) -> Self {
        Self {
            header: StepHeader {
                kind: ChainStepKind::Hierarchical,
                accepted,
                likelihood,
                temperature,
                hierarchical,
            },
            payload: StepPayload::Hierarchical { old_value, new_value },
        }
    }

    #[must_use]
    pub const fn hyper(
        accepted: bool,
        likelihood: f64,
        temperature: f64,
        hierarchical: f64,
        index: i32,
        old_value: f64,
        new_value: f64,
    ) -> Self {
        Self {
            header: StepHeader {
                kind: ChainStepKind::Hyper,
                accepted,
                likelihood,
                temperature,
                hierarchical,
            },
            payload: StepPayload::Hyper {
                index,
                old_value,
                new_value,
            },
        }
    }
}

struct Initial {
    s_v: OrderedMultisetIntDouble,
    likelihood: f64,
    temperature: f64,
    hierarchical: f64,
}

/// Capacity-bounded, replayable edit log.
pub struct ChainHistory {
    capacity: usize,
    initial: Option<Initial>,
    steps: Vec<ChainStep>,
    running: OrderedMultisetIntDouble,
}

fn do_step(s_v: &mut OrderedMultisetIntDouble, step: &ChainStep) -> Result<()> {
    match step.header.kind {
        ChainStepKind::Initialise => Err(bad_arg(
            "Initialise cannot appear as a replayed step",
        )),
        ChainStepKind::PtExchange => Err(bad_arg(
            "PtExchange is unimplemented in chain-history replay",
        )),
        ChainStepKind::Hierarchical | ChainStepKind::Hyper => Ok(()),
        ChainStepKind::Birth | ChainStepKind::Death | ChainStepKind::Value | ChainStepKind::Move => {
            if !step.header.accepted {
                return Ok(());
            }
            match step.payload {
                StepPayload::Birth { depth, index, new_value } => {
                    s_v.insert(depth as i32, index, new_value)?;
                }
                StepPayload::Death { depth, index, .. } => {
                    s_v.remove(depth as i32, index)?;
                }
                StepPayload::Value {
                    depth,
                    index,
                    new_value,
                    ..
                } => {
                    s_v.set(depth as i32, index, new_value)?;
                }
                StepPayload::Move {
                    depth,
                    index,
                    new_index,
                    new_value,
                    ..
                } => {
                    s_v.remove(depth as i32, index)?;
                    s_v.insert(depth as i32, new_index, new_value)?;
                }
                StepPayload::Hierarchical { .. } | StepPayload::PtExchange { .. } | StepPayload::Hyper { .. } => {
                    unreachable!("kind/payload mismatch in ChainStep")
                }
            }
            Ok(())
        }
    }
}

impl ChainHistory {
    /// An uninitialised log with room for `capacity` total records
    /// (including the synthetic initial one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            initial: None,
            steps: Vec::new(),
            running: OrderedMultisetIntDouble::new(),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored records, including the synthetic initial one
    /// (0 if not yet initialised).
    #[must_use]
    pub fn nsteps(&self) -> usize {
        if self.initial.is_some() {
            1 + self.steps.len()
        } else {
            0
        }
    }

    #[must_use]
    pub fn full(&self) -> bool {
        self.nsteps() >= self.capacity
    }

    /// The running `S_v` as of the most recently added step.
    #[must_use]
    pub const fn current_s_v(&self) -> &OrderedMultisetIntDouble {
        &self.running
    }

    /// Seed slot 0 from `s_v`, clearing any prior steps.
    pub fn initialise(
        &mut self,
        s_v: &OrderedMultisetIntDouble,
        likelihood: f64,
        temperature: f64,
        hierarchical: f64,
    ) -> Result<()> {
        debug!(nsteps = 1, "chain history initialised");
        self.initial = Some(Initial {
            s_v: s_v.clone(),
            likelihood,
            temperature,
            hierarchical,
        });
        self.steps.clear();
        self.running = s_v.clone();
        Ok(())
    }

    /// Reseed slot 0 from the current running `S_v`, keeping the last
    /// known likelihood/temperature/hierarchical scalars. A no-op
    /// returning success when there is nothing to compact away.
    pub fn reset(&mut self) -> Result<()> {
        if self.steps.is_empty() {
            return Ok(());
        }
        let last = self.steps.last().expect("checked non-empty above").header;
        self.initial = Some(Initial {
            s_v: self.running.clone(),
            likelihood: last.likelihood,
            temperature: last.temperature,
            hierarchical: last.hierarchical,
        });
        self.steps.clear();
        trace!("chain history reset to running state");
        Ok(())
    }

    /// Apply `step` to the running `S_v` and append it, failing with
    /// an error once at capacity.
    pub fn add_step(&mut self, step: ChainStep) -> Result<()> {
        if self.initial.is_none() {
            return Err(bad_arg("chain history has not been initialised"));
        }
        if self.full() {
            return Err(full());
        }
        do_step(&mut self.running, &step)?;
        self.steps.push(step);
        trace!(nsteps = self.nsteps(), kind = ?step.header.kind, "chain history step added");
        Ok(())
    }

    /// Copy the initial `S_v` into `target`, then replay every stored
    /// step onto it in order, invoking `cb(step_index, step, S_v_after)`
    /// after each. Aborts and propagates the first error `cb` returns.
    pub fn replay(
        &self,
        target: &mut OrderedMultisetIntDouble,
        mut cb: impl FnMut(usize, &ChainStep, &OrderedMultisetIntDouble) -> Result<()>,
    ) -> Result<()> {
        let initial = self
            .initial
            .as_ref()
            .ok_or_else(|| bad_arg("chain history has not been initialised"))?;
        *target = initial.s_v.clone();
        for (i, step) in self.steps.iter().enumerate() {
            do_step(target, step)?;
            cb(i + 1, step, target)?;
        }
        Ok(())
    }

    /// Binary encoding (`SPEC_FULL.md` §6.3): `nsteps` (including slot 0),
    /// the initial `S_v` via its own binary form, the initial scalars,
    /// then one raw record per subsequent step.
    pub fn write_binary<W: Write>(&self, w: &mut W) -> Result<()> {
        let initial = self
            .initial
            .as_ref()
            .ok_or_else(|| bad_arg("chain history has not been initialised"))?;
        w.write_i32(self.nsteps() as i32)?;
        initial.s_v.write_binary(w)?;
        w.write_f64(initial.likelihood)?;
        w.write_f64(initial.temperature)?;
        w.write_f64(initial.hierarchical)?;
        for step in &self.steps {
            write_step(step, w)?;
        }
        Ok(())
    }

    /// Read the binary encoding written by [`Self::write_binary`]. A
    /// truncated tail (clean EOF right at a record boundary) is
    /// tolerated and simply stops replay early; any other short read is
    /// a hard failure.
    pub fn read_binary<R: Read>(capacity: usize, r: &mut R) -> Result<Self> {
        let nsteps = r.read_i32()?;
        if nsteps < 1 {
            return Err(format_error(
                "nsteps must include the synthetic initial record",
            ));
        }
        let s_v = OrderedMultisetIntDouble::read_binary(r)?;
        let likelihood = r.read_f64()?;
        let temperature = r.read_f64()?;
        let hierarchical = r.read_f64()?;

        let mut history = Self {
            capacity,
            initial: Some(Initial {
                s_v: s_v.clone(),
                likelihood,
                temperature,
                hierarchical,
            }),
            steps: Vec::new(),
            running: s_v,
        };

        for _ in 1..nsteps {
            let mut tag_buf = [0u8; 4];
            match r.read_exact_or_eof(&mut tag_buf)? {
                ReadOutcome::Eof => break,
                ReadOutcome::Complete => {
                    let tag = i32::from_le_bytes(tag_buf);
                    let step = read_step_body(tag, r)?;
                    do_step(&mut history.running, &step)?;
                    history.steps.push(step);
                }
            }
        }
        Ok(history)
    }
}

fn kind_tag(kind: ChainStepKind) -> i32 {
    match kind {
        ChainStepKind::Initialise => 0,
        ChainStepKind::Birth => 1,
        ChainStepKind::Death => 2,
        ChainStepKind::Value => 3,
        ChainStepKind::Move => 4,
        ChainStepKind::Hierarchical => 5,
        ChainStepKind::PtExchange => 6,
        ChainStepKind::Hyper => 7,
    }
}

fn write_step<W: Write>(step: &ChainStep, w: &mut W) -> Result<()> {
    w.write_i32(kind_tag(step.header.kind))?;
    w.write_i32(i32::from(step.header.accepted))?;
    w.write_f64(step.header.likelihood)?;
    w.write_f64(step.header.temperature)?;
    w.write_f64(step.header.hierarchical)?;
    match step.payload {
        StepPayload::Birth { depth, index, new_value } => {
            w.write_i32(depth as i32)?;
            w.write_i32(index)?;
            w.write_f64(new_value)?;
        }
        StepPayload::Death { depth, index, old_value } => {
            w.write_i32(depth as i32)?;
            w.write_i32(index)?;
            w.write_f64(old_value)?;
        }
        StepPayload::Value {
            depth,
            index,
            old_value,
            new_value,
        } => {
            w.write_i32(depth as i32)?;
            w.write_i32(index)?;
            w.write_f64(old_value)?;
            w.write_f64(new_value)?;
        }
        StepPayload::Move {
            depth,
            index,
            new_index,
            old_value,
            new_value,
        } => {
            w.write_i32(depth as i32)?;
            w.write_i32(index)?;
            w.write_i32(new_index)?;
            w.write_f64(old_value)?;
            w.write_f64(new_value)?;
        }
        StepPayload::Hierarchical { old_value, new_value } => {
            w.write_f64(old_value)?;
            w.write_f64(new_value)?;
        }
        StepPayload::PtExchange { old_temperature } => {
            w.write_f64(old_temperature)?;
        }
        StepPayload::Hyper {
            index,
            old_value,
            new_value,
        } => {
            w.write_i32(index)?;
            w.write_f64(old_value)?;
            w.write_f64(new_value)?;
        }
    }
    Ok(())
}

fn read_step_body<R: Read>(tag: i32, r: &mut R) -> Result<ChainStep> {
    let accepted = r.read_i32()? != 0;
    let likelihood = r.read_f64()?;
    let temperature = r.read_f64()?;
    let hierarchical = r.read_f64()?;
    let (kind, payload) = match tag {
        1 => {
            let depth = r.read_i32()? as u32;
            let index = r.read_i32()?;
            let new_value = r.read_f64()?;
            (ChainStepKind::Birth, StepPayload::Birth { depth, index, new_value })
        }
        2 => {
            let depth = r.read_i32()? as u32;
            let index = r.read_i32()?;
            let old_value = r.read_f64()?;
            (ChainStepKind::Death, StepPayload::Death { depth, index, old_value })
        }
        3 => {
            let depth = r.read_i32()? as u32;
            let index = r.read_i32()?;
            let old_value = r.read_f64()?;
            let new_value = r.read_f64()?;
            (
                ChainStepKind::Value,
                StepPayload::Value {
                    depth,
                    index,
                    old_value,
                    new_value,
                },
            )
        }
        4 => {
            let depth = r.read_i32()? as u32;
            let index = r.read_i32()?;
            let new_index = r.read_i32()?;
            let old_value = r.read_f64()?;
            let new_value = r.read_f64()?;
            (
                ChainStepKind::Move,
                StepPayload::Move {
                    depth,
                    index,
                    new_index,
                    old_value,
                    new_value,
                },
            )
        }
        5 => {
            let old_value = r.read_f64()?;
            let new_value = r.read_f64()?;
            (
                ChainStepKind::Hierarchical,
                StepPayload::Hierarchical { old_value, new_value },
            )
        }
        6 => {
            let old_temperature = r.read_f64()?;
            (ChainStepKind::PtExchange, StepPayload::PtExchange { old_temperature })
        }
        7 => {
            let index = r.read_i32()?;
            let old_value = r.read_f64()?;
            let new_value = r.read_f64()?;
            (
                ChainStepKind::Hyper,
                StepPayload::Hyper {
                    index,
                    old_value,
                    new_value,
                },
            )
        }
        0 => return Err(format_error("Initialise is not a valid step-record tag")),
        _ => return Err(format_error(format!("unknown chain-history step tag {tag}"))),
    };
    Ok(ChainStep {
        header: StepHeader {
            kind,
            accepted,
            likelihood,
            temperature,
            hierarchical,
        },
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn seeded() -> (ChainHistory, OrderedMultisetIntDouble) {
        let mut s_v = OrderedMultisetIntDouble::new();
        s_v.insert(0, 0, 1.0).unwrap();
        let mut ch = ChainHistory::new(8);
        ch.initialise(&s_v, -10.0, 1.0, 0.0).unwrap();
        (ch, s_v)
    }

    #[test]
    fn add_step_mutates_running_s_v_only_when_accepted() {
        let (mut ch, _) = seeded();
        ch.add_step(ChainStep::birth(true, -9.0, 1.0, 0.0, 1, 3, 2.0))
            .unwrap();
        assert!(ch.current_s_v().is_element(1, 3));

        ch.add_step(ChainStep::birth(false, -9.0, 1.0, 0.0, 1, 5, 2.0))
            .unwrap();
        assert!(!ch.current_s_v().is_element(1, 5));
        assert_eq!(ch.nsteps(), 3);
    }

    #[test]
    fn full_capacity_is_rejected() {
        let mut ch = ChainHistory::new(1);
        let mut s_v = OrderedMultisetIntDouble::new();
        s_v.insert(0, 0, 0.0).unwrap();
        ch.initialise(&s_v, 0.0, 1.0, 0.0).unwrap();
        assert!(ch.full());
        let err = ch
            .add_step(ChainStep::birth(true, 0.0, 1.0, 0.0, 1, 0, 1.0))
            .unwrap_err();
        assert!(err.to_string().contains("full"));
    }

    #[test]
    fn reset_is_noop_with_no_steps() {
        let (mut ch, _) = seeded();
        ch.reset().unwrap();
        assert_eq!(ch.nsteps(), 1);
    }

    #[test]
    fn replay_reproduces_running_state_and_visits_every_step() {
        let (mut ch, _) = seeded();
        ch.add_step(ChainStep::birth(true, -9.0, 1.0, 0.0, 1, 0, 2.0)).unwrap();
        ch.add_step(ChainStep::value(true, -8.0, 1.0, 0.0, 1, 0, 2.0, 5.0))
            .unwrap();

        let mut replayed = OrderedMultisetIntDouble::new();
        let mut visited = Vec::new();
        ch.replay(&mut replayed, |i, step, _s_v| {
            visited.push((i, step.header.kind));
            Ok(())
        })
        .unwrap();

        assert_eq!(visited, vec![(1, ChainStepKind::Birth), (2, ChainStepKind::Value)]);
        assert_eq!(replayed.get(1, 0).unwrap(), 5.0);
        assert_eq!(replayed.get(0, 0).unwrap(), ch.current_s_v().get(0, 0).unwrap());
    }

    #[test]
    fn binary_roundtrip_preserves_steps_and_scalars() {
        let (mut ch, _) = seeded();
        ch.add_step(ChainStep::birth(true, -9.0, 1.0, 0.0, 1, 2, 3.5)).unwrap();
        ch.add_step(ChainStep::death(true, -8.5, 1.0, 0.0, 1, 2, 3.5)).unwrap();

        let mut buf = Vec::new();
        ch.write_binary(&mut buf).unwrap();
        let back = ChainHistory::read_binary(8, &mut Cursor::new(buf)).unwrap();
        assert_eq!(back.nsteps(), ch.nsteps());
        assert_eq!(back.current_s_v().get(0, 0).unwrap(), ch.current_s_v().get(0, 0).unwrap());
    }

    #[test]
    fn replay_rejects_ptexchange_past_slot_zero() {
        let (mut ch, _) = seeded();
        ch.add_step(ChainStep {
            header: StepHeader {
                kind: ChainStepKind::PtExchange,
                accepted: true,
                likelihood: -9.0,
                temperature: 2.0,
                hierarchical: 0.0,
            },
            payload: StepPayload::PtExchange { old_temperature: 1.0 },
        })
        .unwrap_err();
    }
}
