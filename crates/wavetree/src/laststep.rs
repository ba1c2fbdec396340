//! The single pending/last-applied edit record that gives the tree its
//! one-edit-in-flight undo/commit discipline.

/// Which mutating operation produced a [`LastStep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Initialise,
    Birth,
    Death,
    Value,
    Move,
}

/// Enough state to undo the most recent proposal, or to report what it
/// was after it has been committed.
///
/// Exactly one of these is ever "pending" between a `propose_*` call
/// and the following `undo`/`commit` — a second `propose_*` call
/// before resolving the first is a logic error in the caller, not a
/// state this type needs to represent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastStep {
    pub kind: StepKind,
    pub accepted: bool,
    pub depth: u32,
    pub index: i32,
    /// For `Move`: the depth/index the value moved to. Unused for the
    /// other kinds.
    pub dest_index: i32,
    pub old_value: f64,
    pub new_value: f64,
}

impl LastStep {
    pub(crate) const fn initialise(value: f64) -> Self {
        Self {
            kind: StepKind::Initialise,
            accepted: false,
            depth: 0,
            index: 0,
            dest_index: 0,
            old_value: 0.0,
            new_value: value,
        }
    }

    pub(crate) const fn birth(depth: u32, index: i32, value: f64) -> Self {
        Self {
            kind: StepKind::Birth,
            accepted: false,
            depth,
            index,
            dest_index: index,
            old_value: 0.0,
            new_value: value,
        }
    }

    pub(crate) const fn death(depth: u32, index: i32, old_value: f64) -> Self {
        Self {
            kind: StepKind::Death,
            accepted: false,
            depth,
            index,
            dest_index: index,
            old_value,
            new_value: 0.0,
        }
    }

    pub(crate) const fn value(depth: u32, index: i32, old_value: f64, new_value: f64) -> Self {
        Self {
            kind: StepKind::Value,
            accepted: false,
            depth,
            index,
            dest_index: index,
            old_value,
            new_value,
        }
    }

    pub(crate) const fn mv(depth: u32, from: i32, to: i32, old_value: f64, new_value: f64) -> Self {
        Self {
            kind: StepKind::Move,
            accepted: false,
            depth,
            index: from,
            dest_index: to,
            old_value,
            new_value,
        }
    }
}
