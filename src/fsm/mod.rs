//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  StateTable                                  │
//! │  ┌─────────────┬────────────────────────────┐│
//! │  │ NodeState   │ handler                    ││
//! │  ├─────────────┼────────────────────────────┤│
//! │  │ Reset       │ fn(ctx) -> NodeState       ││
//! │  │ Measure     │ fn(ctx) -> NodeState       ││
//! │  │ Report      │ fn(ctx) -> NodeState       ││
//! │  │ MeasureFail │ fn(ctx) -> NodeState       ││
//! │  │ Sleep       │ fn(ctx) -> NodeState       ││
//! │  └─────────────┴────────────────────────────┘│
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Each step the engine calls the handler for the **current** state. The
//! handler runs to completion and returns the next state, which becomes
//! current. Nothing else writes the current state.

pub mod context;
pub mod states;

use context::NodeContext;
use log::info;

use crate::app::ports::Board;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all node states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeState {
    Reset = 0,
    Measure = 1,
    Report = 2,
    MeasureFail = 3,
    Sleep = 4,
}

impl NodeState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 5;

    pub fn name(self) -> &'static str {
        match self {
            Self::Reset => "Reset",
            Self::Measure => "Measure",
            Self::Report => "Report",
            Self::MeasureFail => "MeasureFail",
            Self::Sleep => "Sleep",
        }
    }
}

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Handler signature: run the state's work, return the next state.
pub type StateHandlerFn<B> = fn(&mut NodeContext<B>) -> NodeState;

/// Static descriptor for a single FSM state.
pub struct StateDescriptor<B: Board> {
    pub id: NodeState,
    pub name: &'static str,
    pub handler: StateHandlerFn<B>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm<B: Board> {
    /// Fixed-size table indexed by `NodeState as usize`.
    table: [StateDescriptor<B>; NodeState::COUNT],
    current: NodeState,
    /// Handlers run so far (wraps at u64::MAX).
    steps: u64,
}

impl<B: Board> Fsm<B> {
    pub fn new(table: [StateDescriptor<B>; NodeState::COUNT], initial: NodeState) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial,
            steps: 0,
        }
    }

    pub fn start(&self) {
        info!("FSM starting in state: {}", self.table[self.current as usize].name);
    }

    /// Run the current state's handler once and adopt its result.
    ///
    /// Returns the state that was just left.
    pub fn step(&mut self, ctx: &mut NodeContext<B>) -> NodeState {
        self.steps = self.steps.wrapping_add(1);
        let from = self.current;
        let next = (self.table[from as usize].handler)(ctx);

        if next != from {
            info!(
                "FSM transition: {} -> {}",
                self.table[from as usize].name,
                self.table[next as usize].name
            );
        }
        self.current = next;
        from
    }

    pub fn current_state(&self) -> NodeState {
        self.current
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}
