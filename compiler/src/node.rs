// node.rs — Operator-node lifecycle contract
//
// Every graph operator implements the three-phase `Op` protocol:
// attribute binding, then shape/type resolution with constant folding, then
// structured code emission. The driver invokes the phases strictly in that
// order, once each, in topological node order.
//
// Preconditions: tensors handed to `resolve` were constructed by the loader
//                or produced by an earlier node.
// Postconditions: after `resolve`, the node's output tensor and its buffer
//                 registrations are available to the driver.
// Failure modes: each phase returns a fatal `CompileError`; the driver aborts
//                the whole compilation on the first one.
// Side effects: `print` appends to the caller's output buffer.

use std::rc::Rc;

use crate::error::{CompileError, Result};
use crate::tensor::Tensor;

// ── Attributes ──────────────────────────────────────────────────────────────

/// A typed attribute value from the node descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
}

/// One (name, typed value) entry of a node descriptor's attribute list.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn float(name: impl Into<String>, value: f32) -> Self {
        Attribute {
            name: name.into(),
            value: AttributeValue::Float(value),
        }
    }

    pub fn int(name: impl Into<String>, value: i64) -> Self {
        Attribute {
            name: name.into(),
            value: AttributeValue::Int(value),
        }
    }

    /// The float value, or a malformed-attribute error if the declared type
    /// is anything else.
    pub fn as_float(&self) -> Result<f32> {
        match self.value {
            AttributeValue::Float(v) => Ok(v),
            _ => Err(CompileError::malformed_attribute(format!(
                "bad attribute '{}': expected a float value",
                self.name
            ))),
        }
    }

    /// The integer value, or a malformed-attribute error.
    pub fn as_int(&self) -> Result<i64> {
        match self.value {
            AttributeValue::Int(v) => Ok(v),
            _ => Err(CompileError::malformed_attribute(format!(
                "bad attribute '{}': expected an integer value",
                self.name
            ))),
        }
    }
}

// ── Buffer registration ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindDir {
    Input,
    Output,
}

/// One tensor registered by a node under a symbolic name.
///
/// The symbol becomes the parameter name of the generated node function, so
/// statements emitted by `print` compile against the declaration the driver
/// produces for it.
#[derive(Debug, Clone)]
pub struct Binding {
    pub symbol: &'static str,
    pub dir: BindDir,
    pub tensor: Rc<Tensor>,
}

/// Per-node registration scope, created by the driver before `resolve`.
///
/// Collects the node's input/output bindings in registration order and carries
/// the graph-level names declared for the node's outputs.
#[derive(Debug)]
pub struct NodeScope {
    node_name: String,
    output_names: Vec<String>,
    bindings: Vec<Binding>,
}

impl NodeScope {
    pub fn new(node_name: impl Into<String>, output_names: Vec<String>) -> Self {
        NodeScope {
            node_name: node_name.into(),
            output_names,
            bindings: Vec::new(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Graph-level name declared for the node's `idx`-th output.
    pub fn output_name(&self, idx: usize) -> Result<&str> {
        self.output_names
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| {
                CompileError::arity(format!(
                    "node '{}' declares {} outputs, output {} requested",
                    self.node_name,
                    self.output_names.len(),
                    idx
                ))
            })
    }

    pub fn register_input(&mut self, tensor: &Rc<Tensor>, symbol: &'static str) {
        self.bindings.push(Binding {
            symbol,
            dir: BindDir::Input,
            tensor: Rc::clone(tensor),
        });
    }

    pub fn register_output(&mut self, tensor: &Rc<Tensor>, symbol: &'static str) {
        self.bindings.push(Binding {
            symbol,
            dir: BindDir::Output,
            tensor: Rc::clone(tensor),
        });
    }

    /// Swap the tensor behind an already-registered symbol. Used when a
    /// resolution-time fold replaces a constant input with its folded copy.
    pub fn rebind(&mut self, symbol: &str, tensor: &Rc<Tensor>) {
        let binding = self
            .bindings
            .iter_mut()
            .find(|b| b.symbol == symbol)
            .expect("internal: rebind of a symbol that was never registered");
        binding.tensor = Rc::clone(tensor);
    }

    /// Bindings in registration order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

// ── Lifecycle contract ──────────────────────────────────────────────────────

/// The three-phase operator protocol.
///
/// Phase order (`parse_attributes` → `resolve` → `print`, each called once)
/// is a caller-discipline invariant enforced by the driver, not guarded
/// inside implementations.
pub trait Op: std::fmt::Debug {
    /// Operator kind tag, matching the registry key.
    fn op_name(&self) -> &'static str;

    /// Validate and bind recognized attributes. Unrecognized names and
    /// type-mismatched values are fatal; unspecified attributes keep their
    /// documented defaults.
    fn parse_attributes(&mut self, attrs: &[Attribute]) -> Result<()>;

    /// Validate arity and per-input type constraints, infer the output
    /// shape/type, perform constant folding, and create/register the output
    /// tensor. Runs after `parse_attributes` and before `print`.
    fn resolve(&mut self, inputs: &[Rc<Tensor>], scope: &mut NodeScope) -> Result<()>;

    /// The output tensor created during `resolve`, if any.
    fn output(&self) -> Option<&Rc<Tensor>>;

    /// Emit the node's computation as C statements. Purely a function of
    /// resolved state; cannot fail.
    fn print(&self, out: &mut String);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tensor::DataType;

    #[test]
    fn float_accessor_rejects_int_value() {
        let a = Attribute::int("epsilon", 3);
        let e = a.as_float().unwrap_err();
        assert_eq!(e.kind, ErrorKind::MalformedAttribute);
        assert!(e.message.contains("epsilon"));
    }

    #[test]
    fn int_accessor_rejects_float_value() {
        let a = Attribute::float("spatial", 1.0);
        assert_eq!(a.as_int().unwrap_err().kind, ErrorKind::MalformedAttribute);
    }

    #[test]
    fn scope_records_bindings_in_registration_order() {
        let x = Rc::new(Tensor::runtime("x", DataType::Float, vec![1, 2]).unwrap());
        let y = Rc::new(Tensor::runtime("y", DataType::Float, vec![1, 2]).unwrap());
        let mut scope = NodeScope::new("n0", vec!["out".into()]);
        scope.register_input(&x, "X");
        scope.register_output(&y, "output");

        let bindings = scope.bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].symbol, "X");
        assert_eq!(bindings[0].dir, BindDir::Input);
        assert_eq!(bindings[1].symbol, "output");
        assert_eq!(bindings[1].dir, BindDir::Output);
    }

    #[test]
    fn rebind_replaces_tensor_behind_symbol() {
        let v = Rc::new(Tensor::runtime("v", DataType::Float, vec![2]).unwrap());
        let folded = Rc::new(Tensor::runtime("v_fold", DataType::Float, vec![2]).unwrap());
        let mut scope = NodeScope::new("n0", vec![]);
        scope.register_input(&v, "var");
        scope.rebind("var", &folded);
        assert_eq!(scope.bindings()[0].tensor.name(), "v_fold");
    }

    #[test]
    fn missing_output_name_is_an_arity_error() {
        let scope = NodeScope::new("n0", vec![]);
        assert_eq!(
            scope.output_name(0).unwrap_err().kind,
            ErrorKind::ArityMismatch
        );
    }
}
