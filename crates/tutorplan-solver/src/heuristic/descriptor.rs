//! Explicit planning-variable registrations.

use std::fmt::Debug;

/// Describes one planning variable: its name, typed accessors, and the legal
/// value range the solver may assign from.
///
/// Registrations are built in plain code and passed to the phases as a list;
/// there is no runtime discovery of mutable fields. The value range is
/// captured once per solve from the immutable problem facts, so the full
/// domain is available to every move without re-deriving it.
///
/// # Type Parameters
/// * `S` - The planning solution type
/// * `V` - The variable value type
pub struct VariableDescriptor<S, V> {
    variable_name: &'static str,
    getter: fn(&S, usize) -> Option<V>,
    setter: fn(&mut S, usize, Option<V>),
    value_range: Vec<V>,
}

impl<S, V: Debug> Debug for VariableDescriptor<S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableDescriptor")
            .field("variable_name", &self.variable_name)
            .field("value_range_size", &self.value_range.len())
            .finish()
    }
}

impl<S, V: Clone> Clone for VariableDescriptor<S, V> {
    fn clone(&self) -> Self {
        Self {
            variable_name: self.variable_name,
            getter: self.getter,
            setter: self.setter,
            value_range: self.value_range.clone(),
        }
    }
}

impl<S, V> VariableDescriptor<S, V> {
    /// Registers a planning variable.
    ///
    /// # Arguments
    /// * `variable_name` - Name of the variable (for debugging and events)
    /// * `getter` - Function pointer reading the variable from an entity
    /// * `setter` - Function pointer writing the variable on an entity
    /// * `value_range` - The full legal domain for this variable
    pub fn new(
        variable_name: &'static str,
        getter: fn(&S, usize) -> Option<V>,
        setter: fn(&mut S, usize, Option<V>),
        value_range: Vec<V>,
    ) -> Self {
        Self {
            variable_name,
            getter,
            setter,
            value_range,
        }
    }

    /// Returns the variable name.
    pub fn variable_name(&self) -> &'static str {
        self.variable_name
    }

    /// Returns the getter function pointer.
    pub fn getter(&self) -> fn(&S, usize) -> Option<V> {
        self.getter
    }

    /// Returns the setter function pointer.
    pub fn setter(&self) -> fn(&mut S, usize, Option<V>) {
        self.setter
    }

    /// Returns the registered value range.
    pub fn value_range(&self) -> &[V] {
        &self.value_range
    }
}
