//=========================================================================
// Node Signatures
//=========================================================================
//
// Declared input/output port layout of a node kind.
//
// Signatures are produced once per kind at registration time by
// `Node::on_register` and are immutable afterwards. Ports are appended in
// order, so indices are always dense and zero-based.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::value::{PortData, PortType, PortValue};

//=== DefaultPolicy =======================================================

/// Value an input uses when it is not bound to an edge or graph input.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultPolicy {
    /// Use the port type's default (`false`, `0`, `0.0`, ...).
    TypeDefault,

    /// Use a fixed value declared by the node kind.
    Value(PortValue),
}

//=== Port Declarations ===================================================

/// A declared input port.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPort {
    pub ty: PortType,
    pub default: DefaultPolicy,
}

impl InputPort {
    /// Resolves the default policy into a concrete value.
    pub fn default_value(&self) -> PortValue {
        match &self.default {
            DefaultPolicy::TypeDefault => self.ty.default_value(),
            DefaultPolicy::Value(value) => value.clone(),
        }
    }
}

//=== NodeSignature =======================================================

/// Ordered input and output port types of a node kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeSignature {
    inputs: Vec<InputPort>,
    outputs: Vec<PortType>,
}

impl NodeSignature {
    pub fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PortType] {
        &self.outputs
    }

    pub fn input(&self, index: usize) -> Option<&InputPort> {
        self.inputs.get(index)
    }

    pub fn output(&self, index: usize) -> Option<PortType> {
        self.outputs.get(index).copied()
    }

    /// Type-default values for every output slot.
    pub(crate) fn default_outputs(&self) -> Vec<PortValue> {
        self.outputs.iter().map(|ty| ty.default_value()).collect()
    }
}

//=== SignatureBuilder ====================================================

/// Builder handed to `Node::on_register`.
///
/// # Example
///
/// ```
/// use lumen_engine::core::event::{SignatureBuilder, PortType};
///
/// let mut sig = SignatureBuilder::new();
/// sig.add_input::<bool>().add_input::<bool>().add_output::<bool>();
/// let sig = sig.build();
/// assert_eq!(sig.inputs().len(), 2);
/// assert_eq!(sig.output(0), Some(PortType::Bool));
/// ```
#[derive(Debug, Default)]
pub struct SignatureBuilder {
    signature: NodeSignature,
}

impl SignatureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an input of type `T` using the type default.
    pub fn add_input<T: PortData>(&mut self) -> &mut Self {
        self.add_input_of(T::TYPE, DefaultPolicy::TypeDefault)
    }

    /// Appends an input of type `T` with an explicit default.
    pub fn add_input_with_default<T: PortData>(&mut self, default: T) -> &mut Self {
        self.add_input_of(T::TYPE, DefaultPolicy::Value(default.into_value()))
    }

    /// Appends an input by runtime type tag.
    ///
    /// A `DefaultPolicy::Value` whose type differs from `ty` is rejected
    /// when the kind is registered.
    pub fn add_input_of(&mut self, ty: PortType, default: DefaultPolicy) -> &mut Self {
        self.signature.inputs.push(InputPort { ty, default });
        self
    }

    /// Appends an output of type `T`.
    pub fn add_output<T: PortData>(&mut self) -> &mut Self {
        self.add_output_of(T::TYPE)
    }

    /// Appends an output by runtime type tag.
    pub fn add_output_of(&mut self, ty: PortType) -> &mut Self {
        self.signature.outputs.push(ty);
        self
    }

    pub fn build(self) -> NodeSignature {
        self.signature
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
