// nncc — neural-network graph to standalone C compiler
//
// Library root. Compilation runs loader → per-node lifecycle → codegen.

pub mod codegen;
pub mod error;
pub mod loader;
pub mod node;
pub mod ops;
pub mod registry;
pub mod tensor;
