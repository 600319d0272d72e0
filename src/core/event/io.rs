//=========================================================================
// Node Inputs / Outputs
//=========================================================================
//
// Typed views over a node's port value stores during `execute`.
//
// Reading an input with the wrong type, or writing an output out of range
// or with the wrong type, is a contract violation by the node author:
//   debug builds   → panic
//   release builds → logged, contained (reads yield the type default,
//                    writes are dropped)
//
//=========================================================================

//=== External Dependencies ===============================================

use log::error;

//=== Internal Dependencies ===============================================

use super::value::{PortData, PortValue};

//=== Contract Violations =================================================

#[track_caller]
fn contract_violation(kind: &str, message: std::fmt::Arguments<'_>) {
    if cfg!(debug_assertions) {
        panic!("node contract violation in `{kind}`: {message}");
    }
    error!(target: "events", "Node contract violation in `{}`: {}", kind, message);
}

//=== Inputs ==============================================================

/// Read-only view over a node's gathered input values for this tick.
pub struct Inputs<'a> {
    kind: &'a str,
    values: &'a [PortValue],
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(kind: &'a str, values: &'a [PortValue]) -> Self {
        Self { kind, values }
    }

    /// Reads input `index` as `T`.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `index` is out of range or the declared
    /// type is not `T`.
    #[track_caller]
    pub fn get<T: PortData>(&self, index: usize) -> T {
        match self.values.get(index) {
            Some(value) => match T::from_value(value) {
                Some(v) => v,
                None => {
                    contract_violation(
                        self.kind,
                        format_args!(
                            "input {} read as {}, declared {}",
                            index,
                            T::TYPE,
                            value.port_type()
                        ),
                    );
                    T::type_default()
                }
            },
            None => {
                contract_violation(
                    self.kind,
                    format_args!("input {} out of range ({} declared)", index, self.values.len()),
                );
                T::type_default()
            }
        }
    }

    /// Raw access to input `index`.
    pub fn value(&self, index: usize) -> Option<&PortValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//=== Outputs =============================================================

/// Write view over a node's output slots for this tick.
///
/// Slots start each tick at their type default.
pub struct Outputs<'a> {
    kind: &'a str,
    values: &'a mut [PortValue],
}

impl<'a> Outputs<'a> {
    pub(crate) fn new(kind: &'a str, values: &'a mut [PortValue]) -> Self {
        Self { kind, values }
    }

    /// Writes `value` to output `index`.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `index` is out of range or the declared
    /// type is not `T`.
    #[track_caller]
    pub fn set<T: PortData>(&mut self, index: usize, value: T) {
        self.set_value(index, value.into_value());
    }

    /// Writes a tagged value to output `index`.
    #[track_caller]
    pub fn set_value(&mut self, index: usize, value: PortValue) {
        let declared = self.values.len();
        match self.values.get_mut(index) {
            Some(slot) if slot.port_type() == value.port_type() => *slot = value,
            Some(slot) => contract_violation(
                self.kind,
                format_args!(
                    "output {} written as {}, declared {}",
                    index,
                    value.port_type(),
                    slot.port_type()
                ),
            ),
            None => contract_violation(
                self.kind,
                format_args!("output {} out of range ({} declared)", index, declared),
            ),
        }
    }

    /// Reads back output `index` as written so far this tick.
    pub fn value(&self, index: usize) -> Option<&PortValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_reads() {
        let values = [PortValue::Bool(true), PortValue::Float(1.5)];
        let inputs = Inputs::new("test.node", &values);

        assert!(inputs.get::<bool>(0));
        assert_eq!(inputs.get::<f64>(1), 1.5);
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn typed_writes() {
        let mut values = [PortValue::Bool(false), PortValue::Int(0)];
        let mut outputs = Outputs::new("test.node", &mut values);

        outputs.set(0, true);
        outputs.set(1, 42_i64);
        assert_eq!(outputs.value(1), Some(&PortValue::Int(42)));
        assert_eq!(values, [PortValue::Bool(true), PortValue::Int(42)]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "read as int, declared bool")]
    fn wrong_type_read_panics_in_debug() {
        let values = [PortValue::Bool(true)];
        Inputs::new("test.node", &values).get::<i64>(0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn out_of_range_write_panics_in_debug() {
        let mut values = [PortValue::Bool(false)];
        Outputs::new("test.node", &mut values).set(3, true);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "written as float, declared bool")]
    fn wrong_type_write_panics_in_debug() {
        let mut values = [PortValue::Bool(false)];
        Outputs::new("test.node", &mut values).set(0, 1.0_f64);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn violations_are_contained_in_release() {
        let values = [PortValue::Bool(true)];
        assert_eq!(Inputs::new("test.node", &values).get::<i64>(0), 0);

        let mut out = [PortValue::Bool(false)];
        Outputs::new("test.node", &mut out).set(0, 2.0_f64);
        assert_eq!(out, [PortValue::Bool(false)]);
    }
}
