// tensor.rs — Typed, shaped tensor handles
//
// A tensor is either constant-backed (owns a buffer of element values, known
// at compile time) or runtime-only (storage exists only in the generated
// program). Shape and element type are immutable once constructed; constant
// buffers are never mutated in place — compile-time folding produces a new
// constant tensor instead (see `ops::batch_normalization`).

use std::fmt;

use crate::error::{CompileError, Result};

// ── Element type ────────────────────────────────────────────────────────────

/// Element data types for graph tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Float,
    Double,
    Int32,
    Int64,
}

impl DataType {
    pub fn is_floating_point(self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    /// The C type name used in generated source.
    pub fn c_type(self) -> &'static str {
        match self {
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Int32 => "int32_t",
            DataType::Int64 => "int64_t",
        }
    }

    /// The C sqrt function matching this element type's precision.
    /// Only meaningful for floating-point types.
    pub fn c_sqrt(self) -> &'static str {
        match self {
            DataType::Double => "sqrt",
            _ => "sqrtf",
        }
    }

    /// Parse a graph-document dtype keyword.
    pub fn from_keyword(s: &str) -> Option<DataType> {
        match s {
            "float" => Some(DataType::Float),
            "double" => Some(DataType::Double),
            "int32" => Some(DataType::Int32),
            "int64" => Some(DataType::Int64),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
        };
        f.write_str(s)
    }
}

// ── Constant buffer ─────────────────────────────────────────────────────────

/// Owned element buffer of a constant tensor.
///
/// Only floating-point constants are representable; integer-typed constants
/// are rejected at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstData {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl ConstData {
    pub fn len(&self) -> usize {
        match self {
            ConstData::F32(v) => v.len(),
            ConstData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `i`, widened to f64.
    pub fn get(&self, i: usize) -> Option<f64> {
        match self {
            ConstData::F32(v) => v.get(i).map(|&x| x as f64),
            ConstData::F64(v) => v.get(i).copied(),
        }
    }
}

// ── Tensor ──────────────────────────────────────────────────────────────────

/// A typed, shaped data handle in the graph being compiled.
#[derive(Debug, Clone)]
pub struct Tensor {
    name: String,
    data_type: DataType,
    shape: Vec<usize>,
    data: Option<ConstData>,
}

impl Tensor {
    /// A runtime-only tensor: storage is declared in the generated program,
    /// contents exist only at inference time.
    pub fn runtime(name: impl Into<String>, data_type: DataType, shape: Vec<usize>) -> Result<Self> {
        let name = name.into();
        validate_shape(&name, &shape)?;
        Ok(Tensor {
            name,
            data_type,
            shape,
            data: None,
        })
    }

    /// A constant tensor backed by an owned buffer.
    pub fn constant(
        name: impl Into<String>,
        data_type: DataType,
        shape: Vec<usize>,
        data: ConstData,
    ) -> Result<Self> {
        let name = name.into();
        validate_shape(&name, &shape)?;
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(CompileError::malformed_graph(format!(
                "tensor '{}': {} data elements for shape {:?} (expected {})",
                name,
                data.len(),
                shape,
                expected
            )));
        }
        let buffer_matches = matches!(
            (data_type, &data),
            (DataType::Float, ConstData::F32(_)) | (DataType::Double, ConstData::F64(_))
        );
        if !buffer_matches {
            return Err(CompileError::malformed_graph(format!(
                "tensor '{}': constant buffer does not match element type {}",
                name, data_type
            )));
        }
        Ok(Tensor {
            name,
            data_type,
            shape,
            data: Some(data),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total element count (product of the shape).
    pub fn elem_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_const(&self) -> bool {
        self.data.is_some()
    }

    pub fn const_data(&self) -> Option<&ConstData> {
        self.data.as_ref()
    }

    /// Constant element at flat index `i`, widened to f64.
    /// `None` for runtime tensors or out-of-range indices.
    pub fn const_elem(&self, i: usize) -> Option<f64> {
        self.data.as_ref().and_then(|d| d.get(i))
    }

    /// Splat test: true iff this tensor is constant and every element exactly
    /// equals `value`. Non-constant tensors answer false without their
    /// contents being read. Invoking the test on a non-floating-point tensor
    /// is unimplemented.
    pub fn is_splat(&self, value: f64) -> Result<bool> {
        if !self.data_type.is_floating_point() {
            return Err(CompileError::unimplemented(format!(
                "splat test on non-floating tensor '{}' of type {}",
                self.name, self.data_type
            )));
        }
        let Some(data) = &self.data else {
            return Ok(false);
        };
        Ok(match data {
            ConstData::F32(v) => v.iter().all(|&x| x == value as f32),
            ConstData::F64(v) => v.iter().all(|&x| x == value),
        })
    }
}

fn validate_shape(name: &str, shape: &[usize]) -> Result<()> {
    if shape.is_empty() {
        return Err(CompileError::malformed_graph(format!(
            "tensor '{}' has rank 0; shapes must have at least one dimension",
            name
        )));
    }
    if shape.iter().any(|&d| d == 0) {
        return Err(CompileError::malformed_graph(format!(
            "tensor '{}' has a zero dimension in shape {:?}",
            name, shape
        )));
    }
    Ok(())
}
