// ops — operator implementations
//
// One module per operator kind. Each implements the three-phase `Op`
// contract from `node.rs` and is wired up in `registry.rs`.

pub mod batch_normalization;
