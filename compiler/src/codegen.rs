// codegen.rs — Compilation driver and C translation-unit assembly
//
// Walks the graph's nodes in order, runs the three-phase operator protocol
// on each (parse_attributes → resolve → print), and assembles the emitted
// bodies into one standalone C source file: preamble, constant storage,
// scratch storage, one function per node, and an `entry` function calling
// them in order.
//
// Preconditions: `graph` was produced by the loader; node order is
//                topological.
// Postconditions: returns `GeneratedCode` with the complete C source.
// Failure modes: any node phase error, undefined tensor references, and
//                unproduced graph outputs abort the compilation.
// Side effects: none.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::rc::Rc;

use crate::error::{CompileError, Result};
use crate::loader::Graph;
use crate::node::{BindDir, Binding, NodeScope};
use crate::tensor::{ConstData, Tensor};

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct GeneratedCode {
    pub c_source: String,
}

/// Compile a loaded graph to C source.
pub fn codegen(graph: &mut Graph) -> Result<GeneratedCode> {
    let mut ctx = CodegenCtx::new(graph);
    ctx.run_nodes()?;
    ctx.emit_all();
    Ok(GeneratedCode { c_source: ctx.out })
}

// ── Emission helpers ────────────────────────────────────────────────────────

/// Format an f32 as a C literal. Integral values gain a trailing `.0` so the
/// literal stays floating-point.
pub fn c_float_literal(v: f32) -> String {
    let mut s = format!("{}", v);
    if s.chars().all(|c| c.is_ascii_digit() || c == '-') {
        s.push_str(".0");
    }
    s
}

pub fn c_double_literal(v: f64) -> String {
    let mut s = format!("{}", v);
    if s.chars().all(|c| c.is_ascii_digit() || c == '-') {
        s.push_str(".0");
    }
    s
}

/// Turn a graph-level name into a valid C identifier.
pub fn sanitize_ident(name: &str) -> String {
    let mut s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if s.is_empty() || s.starts_with(|c: char| c.is_ascii_digit()) {
        s.insert(0, '_');
    }
    s
}

/// C array dimension suffix for a shape, e.g. `[1][2][3]`.
pub fn c_dims(shape: &[usize]) -> String {
    let mut s = String::new();
    for d in shape {
        let _ = write!(s, "[{}]", d);
    }
    s
}

fn global_name(t: &Tensor) -> String {
    format!("tensor_{}", sanitize_ident(t.name()))
}

// ── Internal context ────────────────────────────────────────────────────────

struct NodeArtifact {
    fn_name: String,
    bindings: Vec<Binding>,
    body: String,
}

struct CodegenCtx<'a> {
    graph: &'a mut Graph,
    /// Tensors visible at the current point of the walk, keyed by graph name.
    live: HashMap<String, Rc<Tensor>>,
    artifacts: Vec<NodeArtifact>,
    out: String,
}

impl<'a> CodegenCtx<'a> {
    fn new(graph: &'a mut Graph) -> Self {
        let live = graph.tensors.clone();
        CodegenCtx {
            graph,
            live,
            artifacts: Vec::new(),
            out: String::with_capacity(4096),
        }
    }

    // ── Phase 1: run the node lifecycle ─────────────────────────────────

    fn run_nodes(&mut self) -> Result<()> {
        for node in &mut self.graph.nodes {
            node.op.parse_attributes(&node.attributes)?;

            let mut inputs = Vec::with_capacity(node.input_names.len());
            for name in &node.input_names {
                let t = self.live.get(name).ok_or_else(|| {
                    CompileError::malformed_graph(format!(
                        "node '{}' reads undefined tensor '{}'",
                        node.name, name
                    ))
                })?;
                inputs.push(Rc::clone(t));
            }

            let mut scope = NodeScope::new(node.name.clone(), node.output_names.clone());
            node.op.resolve(&inputs, &mut scope)?;

            if let Some(out) = node.op.output() {
                if self
                    .live
                    .insert(out.name().to_string(), Rc::clone(out))
                    .is_some()
                {
                    return Err(CompileError::malformed_graph(format!(
                        "tensor '{}' produced more than once",
                        out.name()
                    )));
                }
            }

            let mut body = String::new();
            node.op.print(&mut body);
            self.artifacts.push(NodeArtifact {
                fn_name: format!("node_{}", sanitize_ident(&node.name)),
                bindings: scope.bindings().to_vec(),
                body,
            });
        }

        for out in &self.graph.outputs {
            if !self.live.contains_key(out) {
                return Err(CompileError::malformed_graph(format!(
                    "graph output '{}' is never produced",
                    out
                )));
            }
        }
        Ok(())
    }

    // ── Phase 2: assemble the translation unit ──────────────────────────

    fn emit_all(&mut self) {
        self.emit_preamble();
        self.emit_const_storage();
        self.emit_scratch_storage();
        self.emit_node_functions();
        self.emit_entry();
    }

    /// Constant tensors get initialized `static const` storage; runtime
    /// tensors that are neither graph inputs nor outputs get uninitialized
    /// `static` scratch storage. Inputs and outputs become `entry`
    /// parameters instead.
    fn classify_storage(&self) -> (Vec<Rc<Tensor>>, Vec<Rc<Tensor>>) {
        let mut seen: HashSet<String> = HashSet::new();
        let mut consts = Vec::new();
        let mut scratch = Vec::new();
        for art in &self.artifacts {
            for b in &art.bindings {
                let t = &b.tensor;
                if !seen.insert(t.name().to_string()) {
                    continue;
                }
                if t.is_const() {
                    consts.push(Rc::clone(t));
                } else if !self.graph.inputs.iter().any(|n| n == t.name())
                    && !self.graph.outputs.iter().any(|n| n == t.name())
                {
                    scratch.push(Rc::clone(t));
                }
            }
        }
        (consts, scratch)
    }

    fn emit_preamble(&mut self) {
        let _ = writeln!(
            self.out,
            "// Generated by nncc {}",
            self.graph.provenance.compiler_version
        );
        let _ = writeln!(
            self.out,
            "// source sha256: {}",
            self.graph.provenance.source_hash_hex()
        );
        self.out.push_str("#include <math.h>\n");
        self.out.push_str("#include <stdint.h>\n");
        self.out.push('\n');
    }

    fn emit_const_storage(&mut self) {
        let (consts, _) = self.classify_storage();
        for t in &consts {
            let values = match t.const_data().expect("internal: const tensor without data") {
                ConstData::F32(v) => v
                    .iter()
                    .map(|&x| c_float_literal(x))
                    .collect::<Vec<_>>()
                    .join(", "),
                ConstData::F64(v) => v
                    .iter()
                    .map(|&x| c_double_literal(x))
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            let _ = writeln!(
                self.out,
                "static const {} {}{} = {{{}}};",
                t.data_type().c_type(),
                global_name(t),
                c_dims(t.shape()),
                values
            );
        }
        if !consts.is_empty() {
            self.out.push('\n');
        }
    }

    fn emit_scratch_storage(&mut self) {
        let (_, scratch) = self.classify_storage();
        for t in &scratch {
            let _ = writeln!(
                self.out,
                "static {} {}{};",
                t.data_type().c_type(),
                global_name(t),
                c_dims(t.shape())
            );
        }
        if !scratch.is_empty() {
            self.out.push('\n');
        }
    }

    fn emit_node_functions(&mut self) {
        for art in &self.artifacts {
            let params = if art.bindings.is_empty() {
                "void".to_string()
            } else {
                art.bindings
                    .iter()
                    .map(binding_param)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let header = format!("static void {}({})\n{{\n", art.fn_name, params);
            self.out.push_str(&header);
            self.out.push_str(&art.body);
            self.out.push_str("}\n\n");
        }
    }

    fn emit_entry(&mut self) {
        let mut params = Vec::new();
        for name in &self.graph.inputs {
            let t = self
                .live
                .get(name)
                .expect("internal: graph input not in tensor table");
            params.push(format!(
                "const {} {}{}",
                t.data_type().c_type(),
                global_name(t),
                c_dims(t.shape())
            ));
        }
        for name in &self.graph.outputs {
            let t = self
                .live
                .get(name)
                .expect("internal: graph output never produced");
            params.push(format!(
                "{} {}{}",
                t.data_type().c_type(),
                global_name(t),
                c_dims(t.shape())
            ));
        }
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };

        let _ = writeln!(self.out, "void entry({})", params);
        self.out.push_str("{\n");
        for art in &self.artifacts {
            let args = art
                .bindings
                .iter()
                .map(|b| global_name(&b.tensor))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(self.out, "    {}({});", art.fn_name, args);
        }
        self.out.push_str("}\n");
    }
}

/// Function parameter declaration for one binding: the symbolic name the
/// node emitted against, with the tensor's C type and dimensions.
fn binding_param(b: &Binding) -> String {
    let qualifier = match b.dir {
        BindDir::Input => "const ",
        BindDir::Output => "",
    };
    format!(
        "{}{} {}{}",
        qualifier,
        b.tensor.data_type().c_type(),
        b.symbol,
        c_dims(b.tensor.shape())
    )
}
