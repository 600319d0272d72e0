//=========================================================================
// World Module
//=========================================================================
//
// Nodes that reach outside the graph: entity record fields and
// fire-and-forget commands.
//
// Kinds:
//   world.get_<type>   (entity, field) -> (value, found)
//   world.set_<type>   (trigger = true, entity, field, value) -> ()
//   world.send         (trigger, name, payload) -> (sent)
//
// <type> is one of bool, int, float, text, entity. Reads of a missing
// field or of a field holding another type yield the type default with
// `found = false`.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::warn;

//=== Internal Dependencies ===============================================

use crate::core::error::DefinitionError;
use crate::core::event::{
    Command, DefaultPolicy, EntityId, EventSystem, Inputs, Node, NodeContext, Outputs, PortType,
    SignatureBuilder,
};

pub const MODULE_NAME: &str = "world";

const FIELD_TYPES: [(PortType, &str); 5] = [
    (PortType::Bool, "bool"),
    (PortType::Int, "int"),
    (PortType::Float, "float"),
    (PortType::Text, "text"),
    (PortType::Entity, "entity"),
];

//=== GetField ============================================================

/// Reads one typed field of an entity record.
#[derive(Debug, Clone, Copy)]
pub struct GetField {
    ty: PortType,
}

impl GetField {
    fn declare(ty: PortType, sig: &mut SignatureBuilder) {
        sig.add_input::<EntityId>()
            .add_input::<String>()
            .add_output_of(ty)
            .add_output::<bool>();
    }
}

/// Matches `on_register`, so `register_node::<GetField>` yields an int field.
impl Default for GetField {
    fn default() -> Self {
        Self { ty: PortType::Int }
    }
}

impl Node for GetField {
    /// Declares the ports of [`GetField::default`]. Other field types are
    /// registered through `register`, which pairs signature and instance.
    fn on_register(sig: &mut SignatureBuilder) {
        Self::declare(Self::default().ty, sig);
    }

    fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, ctx: &mut NodeContext) {
        let entity = inputs.get::<EntityId>(0);
        let field = inputs.get::<String>(1);

        match ctx.world().read(entity, &field) {
            Some(value) if value.port_type() == self.ty => {
                outputs.set_value(0, value);
                outputs.set(1, true);
            }
            Some(value) => {
                warn!(
                    target: "events",
                    "Field `{}` of {} holds {}, expected {}",
                    field,
                    entity,
                    value.port_type(),
                    self.ty
                );
            }
            None => {}
        }
    }
}

//=== SetField ============================================================

/// Writes one typed field of an entity record while triggered.
#[derive(Debug, Clone, Copy)]
pub struct SetField {
    ty: PortType,
}

impl SetField {
    fn declare(ty: PortType, sig: &mut SignatureBuilder) {
        sig.add_input_with_default(true)
            .add_input::<EntityId>()
            .add_input::<String>()
            .add_input_of(ty, DefaultPolicy::TypeDefault);
    }
}

/// Matches `on_register`, so `register_node::<SetField>` yields an int field.
impl Default for SetField {
    fn default() -> Self {
        Self { ty: PortType::Int }
    }
}

impl Node for SetField {
    /// Declares the ports of [`SetField::default`]. Other field types are
    /// registered through `register`, which pairs signature and instance.
    fn on_register(sig: &mut SignatureBuilder) {
        Self::declare(Self::default().ty, sig);
    }

    fn execute(&mut self, inputs: &Inputs, _outputs: &mut Outputs, ctx: &mut NodeContext) {
        if !inputs.get::<bool>(0) {
            return;
        }

        let entity = inputs.get::<EntityId>(1);
        let field = inputs.get::<String>(2);
        if let Some(value) = inputs.value(3) {
            ctx.world_mut().write(entity, &field, value.clone());
        }
    }
}

//=== SendCommand =========================================================

/// Issues a command while triggered. An empty payload is sent as `None`.
#[derive(Debug, Default)]
pub struct SendCommand;

impl Node for SendCommand {
    fn on_register(sig: &mut SignatureBuilder) {
        sig.add_input::<bool>()
            .add_input::<String>()
            .add_input::<String>()
            .add_output::<bool>();
    }

    fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, ctx: &mut NodeContext) {
        if !inputs.get::<bool>(0) {
            return;
        }

        let payload = inputs.get::<String>(2);
        let payload = (!payload.is_empty()).then(|| payload.into());
        let sent = ctx.send(Command::new(inputs.get::<String>(1), payload));
        outputs.set(0, sent);
    }
}

//=== Registration ========================================================

/// Adds the `world` module to `system`.
pub fn register(system: &mut EventSystem) -> Result<(), DefinitionError> {
    let module = system.add_module(MODULE_NAME)?;

    for (ty, suffix) in FIELD_TYPES {
        module.register_kind(
            &format!("get_{suffix}"),
            |sig| GetField::declare(ty, sig),
            move || Box::new(GetField { ty }),
        )?;
        module.register_kind(
            &format!("set_{suffix}"),
            |sig| SetField::declare(ty, sig),
            move || Box::new(SetField { ty }),
        )?;
    }

    module.register_node::<SendCommand>("send")?;
    Ok(())
}

//=========================================================================
// Unit Tests
//=========================================================================
