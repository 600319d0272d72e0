//=========================================================================
// Built-in Modules
//=========================================================================
//
// Node kinds shipped with the engine.
//
//   logic  boolean gates and memory
//   math   float arithmetic, comparison, timing
//   world  entity record fields and commands
//
//=========================================================================

//=== Module Declarations =================================================

pub mod logic;
pub mod math;
pub mod world;

//=== Internal Dependencies ===============================================

use crate::core::error::DefinitionError;
use crate::core::event::EventSystem;

//=== Registration ========================================================

/// Registers every built-in module with `system`.
///
/// # Errors
///
/// [`DefinitionError::DuplicateModule`] if one of the names is taken.
pub fn register_builtin_modules(system: &mut EventSystem) -> Result<(), DefinitionError> {
    logic::register(system)?;
    math::register(system)?;
    world::register(system)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_once() {
        let mut system = EventSystem::new();
        register_builtin_modules(&mut system).unwrap();
        assert_eq!(system.modules().count(), 3);
        assert!(system.resolve("logic.xor").is_ok());
        assert!(system.resolve("math.clock").is_ok());
        assert!(system.resolve("world.send").is_ok());

        assert_eq!(
            register_builtin_modules(&mut system).unwrap_err(),
            DefinitionError::DuplicateModule("logic".into())
        );
    }
}
