// loader.rs — Graph description loader
//
// Deserializes a JSON graph document into tensors and node descriptors, and
// resolves each node's operator implementation against the registry exactly
// once. Nodes are kept in document order, which must be topological.
//
// Preconditions: `registry` is populated with the supported operators.
// Postconditions: returns a `Graph` ready for the codegen driver, plus the
//                 provenance record of the raw source text.
// Failure modes: structurally invalid documents, unknown dtypes or operators,
//                and malformed attribute triples are fatal.
// Side effects: none.

use std::collections::HashMap;
use std::rc::Rc;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{CompileError, Result};
use crate::node::{Attribute, AttributeValue, Op};
use crate::registry::OpRegistry;
use crate::tensor::{ConstData, DataType, Tensor};

// ── Document schema ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GraphDoc {
    #[serde(default)]
    name: Option<String>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    tensors: Vec<TensorDoc>,
    nodes: Vec<NodeDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TensorDoc {
    name: String,
    dtype: String,
    shape: Vec<usize>,
    #[serde(default)]
    data: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDoc {
    name: String,
    op: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    #[serde(default)]
    attributes: Vec<AttributeDoc>,
}

/// An attribute triple: name, declared type, value.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttributeDoc {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    value: serde_json::Value,
}

// ── Loaded graph ────────────────────────────────────────────────────────────

/// One node of the loaded graph: descriptor data plus the dispatched
/// operator implementation.
#[derive(Debug)]
pub struct GraphNode {
    pub name: String,
    pub op_type: String,
    pub op: Box<dyn Op>,
    pub attributes: Vec<Attribute>,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
}

/// The graph being compiled: loader-owned tensors, nodes in topological
/// order, and the graph-level input/output name lists.
#[derive(Debug)]
pub struct Graph {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub tensors: HashMap<String, Rc<Tensor>>,
    pub nodes: Vec<GraphNode>,
    pub provenance: Provenance,
}

/// Provenance metadata for the compilation: SHA-256 of the raw source
/// document plus the compiler version. Surfaced in the generated preamble
/// and via `--emit build-info`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    pub fn from_source(source: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        Provenance {
            source_hash: hasher.finalize().into(),
            compiler_version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Hex string of the source hash (64 characters).
    pub fn source_hash_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.source_hash {
            use std::fmt::Write as _;
            let _ = write!(s, "{:02x}", b);
        }
        s
    }

    pub fn to_json(&self) -> String {
        format!(
            "{{\n  \"source_hash\": \"{}\",\n  \"compiler_version\": \"{}\"\n}}\n",
            self.source_hash_hex(),
            self.compiler_version
        )
    }
}

// ── Loading ─────────────────────────────────────────────────────────────────

/// Load a graph document from its JSON text.
pub fn load(source: &str, registry: &OpRegistry) -> Result<Graph> {
    let doc: GraphDoc = serde_json::from_str(source)
        .map_err(|e| CompileError::malformed_graph(format!("invalid graph document: {}", e)))?;

    let mut tensors: HashMap<String, Rc<Tensor>> = HashMap::new();
    for t in &doc.tensors {
        if tensors.contains_key(&t.name) {
            return Err(CompileError::malformed_graph(format!(
                "tensor '{}' declared twice",
                t.name
            )));
        }
        tensors.insert(t.name.clone(), Rc::new(build_tensor(t)?));
    }

    for input in &doc.inputs {
        let Some(t) = tensors.get(input) else {
            return Err(CompileError::malformed_graph(format!(
                "graph input '{}' is not a declared tensor",
                input
            )));
        };
        if t.is_const() {
            return Err(CompileError::malformed_graph(format!(
                "graph input '{}' must not be constant",
                input
            )));
        }
    }

    let mut nodes = Vec::with_capacity(doc.nodes.len());
    let mut node_names: HashMap<&str, ()> = HashMap::new();
    for n in &doc.nodes {
        if node_names.insert(n.name.as_str(), ()).is_some() {
            return Err(CompileError::malformed_graph(format!(
                "node '{}' declared twice",
                n.name
            )));
        }
        let Some(op) = registry.create(&n.op) else {
            return Err(CompileError::unimplemented(format!(
                "unsupported operator '{}' (node '{}')",
                n.op, n.name
            )));
        };
        let attributes = n
            .attributes
            .iter()
            .map(build_attribute)
            .collect::<Result<Vec<_>>>()?;
        nodes.push(GraphNode {
            name: n.name.clone(),
            op_type: n.op.clone(),
            op,
            attributes,
            input_names: n.inputs.clone(),
            output_names: n.outputs.clone(),
        });
    }

    Ok(Graph {
        name: doc.name.unwrap_or_else(|| "network".to_string()),
        inputs: doc.inputs,
        outputs: doc.outputs,
        tensors,
        nodes,
        provenance: Provenance::from_source(source),
    })
}

fn build_tensor(doc: &TensorDoc) -> Result<Tensor> {
    let Some(dtype) = DataType::from_keyword(&doc.dtype) else {
        return Err(CompileError::malformed_graph(format!(
            "tensor '{}' has unknown dtype '{}'",
            doc.name, doc.dtype
        )));
    };
    match &doc.data {
        None => Tensor::runtime(&doc.name, dtype, doc.shape.clone()),
        Some(values) => {
            let data = match dtype {
                DataType::Float => ConstData::F32(values.iter().map(|&v| v as f32).collect()),
                DataType::Double => ConstData::F64(values.clone()),
                _ => {
                    return Err(CompileError::unimplemented(format!(
                        "constant tensor '{}' of type {} not implemented",
                        doc.name, dtype
                    )))
                }
            };
            Tensor::constant(&doc.name, dtype, doc.shape.clone(), data)
        }
    }
}

fn build_attribute(doc: &AttributeDoc) -> Result<Attribute> {
    match doc.ty.as_str() {
        "float" => {
            let Some(v) = doc.value.as_f64() else {
                return Err(CompileError::malformed_attribute(format!(
                    "bad attribute '{}': missing or non-numeric float value",
                    doc.name
                )));
            };
            Ok(Attribute {
                name: doc.name.clone(),
                value: AttributeValue::Float(v as f32),
            })
        }
        "int" => {
            let Some(v) = doc.value.as_i64() else {
                return Err(CompileError::malformed_attribute(format!(
                    "bad attribute '{}': missing or non-integer value",
                    doc.name
                )));
            };
            Ok(Attribute {
                name: doc.name.clone(),
                value: AttributeValue::Int(v),
            })
        }
        other => Err(CompileError::malformed_attribute(format!(
            "bad attribute '{}': unrecognized declared type '{}'",
            doc.name, other
        ))),
    }
}
