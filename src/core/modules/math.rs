//=========================================================================
// Math Module
//=========================================================================
//
// Float arithmetic, comparison and tick timing.
//
// Kinds:
//   math.add / sub / mul / div / min / max   (float, float) -> float
//   math.less / greater / equal              (float, float) -> bool
//   math.select                              (bool, float, float) -> float
//   math.clock                               () -> (delta, elapsed, tick)
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::error::DefinitionError;
use crate::core::event::{EventSystem, Inputs, Node, NodeContext, Outputs, SignatureBuilder};

pub const MODULE_NAME: &str = "math";

//=== Arithmetic ==========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 6] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Min,
        Self::Max,
    ];

    pub fn kind_name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Division by zero yields `0.0`.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div if b == 0.0 => 0.0,
            Self::Div => a / b,
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArithmeticNode {
    op: ArithmeticOp,
}

impl ArithmeticNode {
    pub fn new(op: ArithmeticOp) -> Self {
        Self { op }
    }
}

impl Node for ArithmeticNode {
    fn on_register(sig: &mut SignatureBuilder) {
        sig.add_input::<f64>().add_input::<f64>().add_output::<f64>();
    }

    fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, _ctx: &mut NodeContext) {
        outputs.set(0, self.op.apply(inputs.get(0), inputs.get(1)));
    }
}

//=== Comparison ==========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    Greater,
    Equal,
}

impl CompareOp {
    pub const ALL: [CompareOp; 3] = [Self::Less, Self::Greater, Self::Equal];

    pub fn kind_name(self) -> &'static str {
        match self {
            Self::Less => "less",
            Self::Greater => "greater",
            Self::Equal => "equal",
        }
    }

    pub fn apply(self, a: f64, b: f64) -> bool {
        match self {
            Self::Less => a < b,
            Self::Greater => a > b,
            Self::Equal => a == b,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompareNode {
    op: CompareOp,
}

impl CompareNode {
    pub fn new(op: CompareOp) -> Self {
        Self { op }
    }
}

impl Node for CompareNode {
    fn on_register(sig: &mut SignatureBuilder) {
        sig.add_input::<f64>().add_input::<f64>().add_output::<bool>();
    }

    fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, _ctx: &mut NodeContext) {
        outputs.set(0, self.op.apply(inputs.get(0), inputs.get(1)));
    }
}

//=== Select ==============================================================

/// Picks the second input when the condition is true, the third otherwise.
#[derive(Debug, Default)]
pub struct Select;

impl Node for Select {
    fn on_register(sig: &mut SignatureBuilder) {
        sig.add_input::<bool>()
            .add_input::<f64>()
            .add_input::<f64>()
            .add_output::<f64>();
    }

    fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, _ctx: &mut NodeContext) {
        let picked = if inputs.get::<bool>(0) { 1 } else { 2 };
        outputs.set(0, inputs.get::<f64>(picked));
    }
}

//=== Clock ===============================================================

/// Exposes tick timing: delta time, accumulated time and tick index.
#[derive(Debug, Default)]
pub struct Clock {
    elapsed: f64,
}

impl Node for Clock {
    fn on_register(sig: &mut SignatureBuilder) {
        sig.add_output::<f64>().add_output::<f64>().add_output::<i64>();
    }

    fn execute(&mut self, _inputs: &Inputs, outputs: &mut Outputs, ctx: &mut NodeContext) {
        self.elapsed += ctx.delta_time();
        outputs.set(0, ctx.delta_time());
        outputs.set(1, self.elapsed);
        outputs.set(2, ctx.tick() as i64);
    }
}

//=== Registration ========================================================

/// Adds the `math` module to `system`.
pub fn register(system: &mut EventSystem) -> Result<(), DefinitionError> {
    let module = system.add_module(MODULE_NAME)?;

    for op in ArithmeticOp::ALL {
        module.register_kind(op.kind_name(), ArithmeticNode::on_register, move || {
            Box::new(ArithmeticNode::new(op))
        })?;
    }
    for op in CompareOp::ALL {
        module.register_kind(op.kind_name(), CompareNode::on_register, move || {
            Box::new(CompareNode::new(op))
        })?;
    }

    module.register_node::<Select>("select")?;
    module.register_node::<Clock>("clock")?;
    Ok(())
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::event::{GraphBuilder, PortType, PortValue};

    fn system() -> EventSystem {
        let mut system = EventSystem::new();
        register(&mut system).unwrap();
        system
    }

    #[test]
    fn arithmetic_ops() {
        assert_eq!(ArithmeticOp::Add.apply(2.0, 3.0), 5.0);
        assert_eq!(ArithmeticOp::Sub.apply(2.0, 3.0), -1.0);
        assert_eq!(ArithmeticOp::Mul.apply(2.0, 3.0), 6.0);
        assert_eq!(ArithmeticOp::Div.apply(3.0, 2.0), 1.5);
        assert_eq!(ArithmeticOp::Div.apply(3.0, 0.0), 0.0);
        assert_eq!(ArithmeticOp::Min.apply(2.0, 3.0), 2.0);
        assert_eq!(ArithmeticOp::Max.apply(2.0, 3.0), 3.0);
    }

    #[test]
    fn compare_ops() {
        assert!(CompareOp::Less.apply(1.0, 2.0));
        assert!(!CompareOp::Greater.apply(1.0, 2.0));
        assert!(CompareOp::Equal.apply(2.0, 2.0));
    }

    #[test]
    fn threshold_select_graph() {
        // out = x > limit ? limit : x
        let mut system = system();
        let mut builder = GraphBuilder::new("clamp");
        let greater = builder.add_node(&system.resolve("math.greater").unwrap());
        let select = builder.add_node(&system.resolve("math.select").unwrap());
        builder.add_input("x", PortType::Float).unwrap();
        builder.bind_input("x", greater, 0).unwrap();
        builder.set_constant(greater, 1, 10.0).unwrap();
        builder.connect(greater, 0, select, 0).unwrap();
        builder.set_constant(select, 1, 10.0).unwrap();
        builder.bind_input("x", select, 2).unwrap();
        builder.expose_output("out", select, 0).unwrap();
        let graph = Arc::new(builder.seal().unwrap());

        let id = system.instantiate(&graph);
        for (x, expected) in [(3.0, 3.0), (12.0, 10.0)] {
            system.graph_mut(id).unwrap().set_input("x", x).unwrap();
            system.update(0.0);
            assert_eq!(system.graph(id).unwrap().output("out"), Some(&PortValue::Float(expected)));
        }
    }

    #[test]
    fn clock_accumulates_delta_time() {
        let mut system = system();
        let mut builder = GraphBuilder::new("clock");
        let clock = builder.add_node(&system.resolve("math.clock").unwrap());
        let graph = Arc::new(builder.seal().unwrap());
        let id = system.instantiate(&graph);

        system.update(0.25);
        system.update(0.5);

        let instance = system.graph(id).unwrap();
        assert_eq!(instance.node_output(clock, 0), Some(&PortValue::Float(0.5)));
        assert_eq!(instance.node_output(clock, 1), Some(&PortValue::Float(0.75)));
        assert_eq!(instance.node_output(clock, 2), Some(&PortValue::Int(2)));
    }
}
