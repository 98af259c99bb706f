// registry.rs — Operator implementation registry
//
// Maps operator-name strings to factories producing an `Op` implementation.
// Dispatch happens once per node at load time; compilation itself performs
// no further polymorphic lookups.

use std::collections::HashMap;

use crate::error::{CompileError, Result};
use crate::node::Op;
use crate::ops::batch_normalization::BatchNormalization;

/// Factory producing a fresh, unconfigured operator instance.
pub type OpFactory = fn() -> Box<dyn Op>;

/// Registry of supported operator kinds.
pub struct OpRegistry {
    ops: HashMap<&'static str, OpFactory>,
}

impl Default for OpRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OpRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        OpRegistry {
            ops: HashMap::new(),
        }
    }

    /// A registry populated with every built-in operator.
    pub fn with_builtin_ops() -> Self {
        let mut r = Self::new();
        r.register("BatchNormalization", || Box::new(BatchNormalization::new()))
            .expect("internal: duplicate built-in operator registration");
        r
    }

    /// Register a factory for an operator name. Re-registering a name is an
    /// error; operator kinds have exactly one implementation.
    pub fn register(&mut self, name: &'static str, factory: OpFactory) -> Result<()> {
        if self.ops.contains_key(name) {
            return Err(CompileError::malformed_graph(format!(
                "operator '{}' registered twice",
                name
            )));
        }
        self.ops.insert(name, factory);
        Ok(())
    }

    /// Instantiate the implementation for an operator name, if supported.
    pub fn create(&self, name: &str) -> Option<Box<dyn Op>> {
        self.ops.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Supported operator names, sorted for stable diagnostics.
    pub fn op_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.ops.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
