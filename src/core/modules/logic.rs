//=========================================================================
// Logic Module
//=========================================================================
//
// Boolean gates and boolean memory.
//
// Kinds:
//   logic.and / or / xor / not   (bool, bool) -> bool
//   logic.latch                  (set, reset) -> bool   (reset wins)
//   logic.rising_edge            (bool) -> bool
//
// All four gates are one LogicNode parameterized by LogicOp. `not` keeps
// the two-input shape of the other gates and ignores its second input.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::error::DefinitionError;
use crate::core::event::{EventSystem, Inputs, Node, NodeContext, Outputs, SignatureBuilder};

pub const MODULE_NAME: &str = "logic";

//=== LogicOp =============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Xor,
    Not,
}

impl LogicOp {
    pub const ALL: [LogicOp; 4] = [Self::And, Self::Or, Self::Xor, Self::Not];

    /// Name the gate is registered under.
    pub fn kind_name(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Not => "not",
        }
    }

    pub fn apply(self, a: bool, b: bool) -> bool {
        match self {
            Self::And => a && b,
            Self::Or => a || b,
            Self::Xor => a ^ b,
            Self::Not => !a,
        }
    }
}

//=== LogicNode ===========================================================

/// Stateless two-input boolean gate.
#[derive(Debug, Clone, Copy)]
pub struct LogicNode {
    op: LogicOp,
}

impl LogicNode {
    pub fn new(op: LogicOp) -> Self {
        Self { op }
    }
}

impl Node for LogicNode {
    fn on_register(sig: &mut SignatureBuilder) {
        sig.add_input::<bool>().add_input::<bool>().add_output::<bool>();
    }

    fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, _ctx: &mut NodeContext) {
        let result = self.op.apply(inputs.get::<bool>(0), inputs.get::<bool>(1));
        outputs.set(0, result);
    }
}

//=== Latch ===============================================================

/// Set/reset memory. Holds its state across ticks.
#[derive(Debug, Default)]
pub struct Latch {
    state: bool,
}

impl Node for Latch {
    fn on_register(sig: &mut SignatureBuilder) {
        sig.add_input::<bool>().add_input::<bool>().add_output::<bool>();
    }

    fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, _ctx: &mut NodeContext) {
        if inputs.get::<bool>(1) {
            self.state = false;
        } else if inputs.get::<bool>(0) {
            self.state = true;
        }
        outputs.set(0, self.state);
    }
}

//=== RisingEdge ==========================================================

/// True for exactly one tick when its input goes from false to true.
#[derive(Debug, Default)]
pub struct RisingEdge {
    previous: bool,
}

impl Node for RisingEdge {
    fn on_register(sig: &mut SignatureBuilder) {
        sig.add_input::<bool>().add_output::<bool>();
    }

    fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, _ctx: &mut NodeContext) {
        let current = inputs.get::<bool>(0);
        outputs.set(0, current && !self.previous);
        self.previous = current;
    }
}

//=== Registration ========================================================

/// Adds the `logic` module to `system`.
pub fn register(system: &mut EventSystem) -> Result<(), DefinitionError> {
    let module = system.add_module(MODULE_NAME)?;

    for op in LogicOp::ALL {
        module.register_kind(op.kind_name(), LogicNode::on_register, move || {
            Box::new(LogicNode::new(op))
        })?;
    }

    module.register_node::<Latch>("latch")?;
    module.register_node::<RisingEdge>("rising_edge")?;
    Ok(())
}

//=========================================================================
// Unit Tests
//=========================================================================
