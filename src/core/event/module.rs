//=========================================================================
// Modules
//=========================================================================
//
// A module is a named registry of node kinds. Graphs reference kinds as
// `module.node`; the module name is the namespace.
//
//=========================================================================

//=== External Dependencies ===============================================

use indexmap::IndexMap;
use log::debug;

//=== Internal Dependencies ===============================================

use super::node::{Node, NodeKind};
use super::signature::{DefaultPolicy, NodeSignature, SignatureBuilder};
use crate::core::error::DefinitionError;

//=== Module ==============================================================

/// Named registry mapping node-kind names to [`NodeKind`]s.
#[derive(Debug)]
pub struct Module {
    name: String,
    kinds: IndexMap<String, NodeKind>,
}

impl Module {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kinds: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    //--- Registration -----------------------------------------------------

    /// Registers node type `N` under `name`.
    ///
    /// `N::on_register` runs once here. Instances are created with
    /// `N::default()`.
    ///
    /// # Errors
    ///
    /// [`DefinitionError::DuplicateNode`] if `name` is taken; the module is
    /// left unchanged.
    pub fn register_node<N>(&mut self, name: &str) -> Result<&NodeKind, DefinitionError>
    where
        N: Node + Default + 'static,
    {
        self.register_kind(name, N::on_register, || Box::new(N::default()))
    }

    /// Registers a parameterized node kind.
    ///
    /// Lets one node type back several kinds that share a signature shape
    /// and differ only in how instances are configured.
    pub fn register_kind<S, F>(
        &mut self,
        name: &str,
        declare: S,
        factory: F,
    ) -> Result<&NodeKind, DefinitionError>
    where
        S: FnOnce(&mut SignatureBuilder),
        F: Fn() -> Box<dyn Node> + Send + Sync + 'static,
    {
        if self.kinds.contains_key(name) {
            return Err(DefinitionError::DuplicateNode {
                module: self.name.clone(),
                node: name.to_owned(),
            });
        }

        let qualified = format!("{}.{}", self.name, name);

        let mut builder = SignatureBuilder::new();
        declare(&mut builder);
        let signature = builder.build();
        validate_defaults(&qualified, &signature)?;

        debug!(
            target: "events",
            "Registered node kind `{}` ({} in, {} out)",
            qualified,
            signature.inputs().len(),
            signature.outputs().len()
        );

        let kind = NodeKind::new(qualified, signature, factory);
        let entry = self.kinds.entry(name.to_owned()).or_insert(kind);
        Ok(&*entry)
    }

    //--- Lookup -----------------------------------------------------------

    pub fn kind(&self, name: &str) -> Option<&NodeKind> {
        self.kinds.get(name)
    }

    /// Registered kind names in registration order.
    pub fn kind_names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn validate_defaults(kind: &str, signature: &NodeSignature) -> Result<(), DefinitionError> {
    for (port, input) in signature.inputs().iter().enumerate() {
        if let DefaultPolicy::Value(value) = &input.default {
            if value.port_type() != input.ty {
                return Err(DefinitionError::InvalidDefault {
                    kind: kind.to_owned(),
                    port,
                    expected: input.ty,
                    found: value.port_type(),
                });
            }
        }
    }
    Ok(())
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::{Inputs, NodeContext, Outputs, PortType, PortValue};

    #[derive(Default)]
    struct Pass;

    impl Node for Pass {
        fn on_register(sig: &mut SignatureBuilder) {
            sig.add_input::<f64>().add_output::<f64>();
        }

        fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, _ctx: &mut NodeContext) {
            outputs.set(0, inputs.get::<f64>(0));
        }
    }

    #[derive(Default)]
    struct Flag;

    impl Node for Flag {
        fn on_register(sig: &mut SignatureBuilder) {
            sig.add_output::<bool>();
        }

        fn execute(&mut self, _inputs: &Inputs, outputs: &mut Outputs, _ctx: &mut NodeContext) {
            outputs.set(0, true);
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut module = Module::new("math");
        let kind = module.register_node::<Pass>("pass").unwrap();

        assert_eq!(kind.name(), "math.pass");
        assert_eq!(kind.signature().output(0), Some(PortType::Float));
        assert!(module.kind("pass").is_some());
        assert!(module.kind("missing").is_none());
    }

    #[test]
    fn duplicate_registration_fails_and_leaves_module_unchanged() {
        let mut module = Module::new("math");
        module.register_node::<Pass>("pass").unwrap();

        let err = module.register_node::<Flag>("pass").unwrap_err();
        assert_eq!(
            err,
            DefinitionError::DuplicateNode {
                module: "math".into(),
                node: "pass".into()
            }
        );

        assert_eq!(module.len(), 1);
        let kind = module.kind("pass").unwrap();
        assert_eq!(kind.signature().inputs().len(), 1);
        assert_eq!(kind.signature().output(0), Some(PortType::Float));
    }

    #[test]
    fn mismatched_default_is_rejected() {
        let mut module = Module::new("bad");
        let err = module
            .register_kind(
                "node",
                |sig| {
                    sig.add_input_of(PortType::Bool, DefaultPolicy::Value(PortValue::Int(1)));
                },
                || Box::new(Flag),
            )
            .unwrap_err();

        assert!(matches!(err, DefinitionError::InvalidDefault { port: 0, .. }));
        assert!(module.is_empty());
    }

    #[test]
    fn kind_names_keep_registration_order() {
        let mut module = Module::new("m");
        module.register_node::<Pass>("b").unwrap();
        module.register_node::<Flag>("a").unwrap();

        assert_eq!(module.kind_names().collect::<Vec<_>>(), ["b", "a"]);
    }
}
