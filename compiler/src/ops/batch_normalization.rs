// batch_normalization.rs — BatchNormalization operator
//
// Whitening of activations in the middle of the network, computed per
// element as
//
//     tmp = (X[b,c,...] - mean[c]) / sqrt(var[c] + epsilon)
//     output[b,c,...] = tmp * scale[c] + bias[c]
//
// Running statistics updates (the optional training-time outputs) are not
// emitted; only inference-time computation is generated.
//
// Resolution-time simplifications, each independently applicable:
//   * scale is a constant splat of 1.0  → the multiplication is dropped;
//   * bias is a constant splat of 0.0   → the addition is dropped;
//   * var is constant                   → sqrt(var + epsilon) is folded into
//     a new constant tensor and the emitted code divides by it directly.

use std::fmt::Write as _;
use std::rc::Rc;

use crate::codegen::c_float_literal;
use crate::error::{CompileError, Result};
use crate::node::{Attribute, NodeScope, Op};
use crate::tensor::{ConstData, Tensor};

#[derive(Debug)]
pub struct BatchNormalization {
    epsilon: f32,
    momentum: f32,
    /// Set when the variance denominator was precomputed at resolve time.
    sqrt_var_offline: bool,

    // role-bound inputs; scale/bias become None when their term is dropped
    x: Option<Rc<Tensor>>,
    scale: Option<Rc<Tensor>>,
    bias: Option<Rc<Tensor>>,
    mean: Option<Rc<Tensor>>,
    var: Option<Rc<Tensor>>,
    output: Option<Rc<Tensor>>,
}

impl Default for BatchNormalization {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchNormalization {
    pub fn new() -> Self {
        BatchNormalization {
            epsilon: 1e-5,
            momentum: 0.9,
            sqrt_var_offline: false,
            x: None,
            scale: None,
            bias: None,
            mean: None,
            var: None,
            output: None,
        }
    }

    /// Precompute the whole denominator: a new constant tensor holding
    /// `sqrt(v + epsilon)` for every element of `var`. The source tensor is
    /// left untouched, so other consumers of it observe the original values.
    fn fold_variance(&self, var: &Tensor, node_name: &str) -> Result<Tensor> {
        let data = var
            .const_data()
            .expect("internal: variance fold on a runtime tensor");
        let folded = match data {
            ConstData::F32(v) => {
                ConstData::F32(v.iter().map(|&x| (x + self.epsilon).sqrt()).collect())
            }
            ConstData::F64(v) => ConstData::F64(
                v.iter()
                    .map(|&x| (x + self.epsilon as f64).sqrt())
                    .collect(),
            ),
        };
        Tensor::constant(
            format!("{}_var_fold", node_name),
            var.data_type(),
            var.shape().to_vec(),
            folded,
        )
    }
}

impl Op for BatchNormalization {
    fn op_name(&self) -> &'static str {
        "BatchNormalization"
    }

    /// `epsilon` (float, default 1e-5) and `momentum` (float, default 0.9;
    /// parsed but computationally unused, kept so graphs exported with
    /// training metadata stay loadable). `spatial` was removed from later
    /// graph-format versions; only its default value 1 is accepted.
    fn parse_attributes(&mut self, attrs: &[Attribute]) -> Result<()> {
        for a in attrs {
            match a.name.as_str() {
                "epsilon" => self.epsilon = a.as_float()?,
                "momentum" => self.momentum = a.as_float()?,
                "spatial" => {
                    if a.as_int()? != 1 {
                        return Err(CompileError::unimplemented(
                            "non-default value for 'spatial' attribute not implemented",
                        ));
                    }
                }
                _ => {
                    return Err(CompileError::unknown_attribute(
                        "BatchNormalization",
                        &a.name,
                    ))
                }
            }
        }
        Ok(())
    }

    fn resolve(&mut self, inputs: &[Rc<Tensor>], scope: &mut NodeScope) -> Result<()> {
        if inputs.len() != 5 {
            return Err(CompileError::arity(format!(
                "wrong number of inputs to BatchNormalization: expected 5, got {}",
                inputs.len()
            )));
        }

        let x = &inputs[0];
        scope.register_input(x, "X");
        let scale = &inputs[1];
        scope.register_input(scale, "scale");
        let bias = &inputs[2];
        scope.register_input(bias, "bias");
        let mean = &inputs[3];
        scope.register_input(mean, "mean");
        let var = &inputs[4];
        scope.register_input(var, "var");

        for t in inputs {
            if !t.data_type().is_floating_point() {
                return Err(CompileError::type_constraint(format!(
                    "input '{}' to BatchNormalization has type {}; all inputs must be floating-point",
                    t.name(),
                    t.data_type()
                )));
            }
        }
        if x.rank() < 2 {
            return Err(CompileError::type_constraint(format!(
                "input 'X' to BatchNormalization has rank {}; batch and channel dimensions are required",
                x.rank()
            )));
        }

        self.x = Some(Rc::clone(x));
        self.mean = Some(Rc::clone(mean));

        // scale and bias are not optional in the graph format, but an
        // all-ones scale or all-zeros bias makes its term a no-op.
        self.scale = if scale.is_splat(1.0)? {
            None
        } else {
            Some(Rc::clone(scale))
        };
        self.bias = if bias.is_splat(0.0)? {
            None
        } else {
            Some(Rc::clone(bias))
        };

        if var.is_const() {
            let folded = Rc::new(self.fold_variance(var, scope.node_name())?);
            scope.rebind("var", &folded);
            self.var = Some(folded);
            self.sqrt_var_offline = true;
        } else {
            self.var = Some(Rc::clone(var));
        }

        let out_name = scope.output_name(0)?.to_string();
        let output = Rc::new(Tensor::runtime(out_name, x.data_type(), x.shape().to_vec())?);
        scope.register_output(&output, "output");
        self.output = Some(output);
        Ok(())
    }

    fn output(&self) -> Option<&Rc<Tensor>> {
        self.output.as_ref()
    }

    fn print(&self, out: &mut String) {
        let x = self.x.as_ref().expect("internal: print before resolve");
        let dtype = x.data_type();
        let shape = x.shape();

        let _ = writeln!(out, "    // BatchNormalization");
        let _ = writeln!(out, "    //   epsilon  = {}", c_float_literal(self.epsilon));
        let _ = writeln!(out, "    //   momentum = {}", c_float_literal(self.momentum));
        if !self.sqrt_var_offline {
            let _ = writeln!(
                out,
                "    const {} epsilon = {};",
                dtype.c_type(),
                c_float_literal(self.epsilon)
            );
        }

        // One loop per dimension: batch, channel, then the trailing spatial
        // dims. The subscript string grows in loop order.
        let mut idx = String::new();
        for (i, &dim) in shape.iter().enumerate() {
            let v = match i {
                0 => "b".to_string(),
                1 => "c".to_string(),
                _ => format!("i{}", i),
            };
            let pad = "    ".repeat(i + 1);
            let _ = writeln!(out, "{}for (int32_t {} = 0; {} < {}; {}++) {{", pad, v, v, dim, v);
            idx.push('[');
            idx.push_str(&v);
            idx.push(']');
        }

        let body = "    ".repeat(shape.len() + 1);
        let denom = if self.sqrt_var_offline {
            "var[c]".to_string()
        } else {
            format!("{}(var[c] + epsilon)", dtype.c_sqrt())
        };
        let _ = writeln!(
            out,
            "{}{} tmp = (X{} - mean[c]) / {};",
            body,
            dtype.c_type(),
            idx,
            denom
        );

        let mut rhs = String::from("tmp");
        if self.scale.is_some() {
            rhs.push_str(" * scale[c]");
        }
        if self.bias.is_some() {
            rhs.push_str(" + bias[c]");
        }
        let _ = writeln!(out, "{}output{} = {};", body, idx, rhs);

        for i in (0..shape.len()).rev() {
            let _ = writeln!(out, "{}}}", "    ".repeat(i + 1));
        }
    }
}
