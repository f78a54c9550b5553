//! qc-compiler - Query compiler core
//!
//! This crate turns an operator-call tree into dialect SQL text: lowering
//! into a relational IR, binding of members and links, dialect method
//! lowering, reduction passes and the text renderer, behind the
//! [`QueryCompiler`] facade.

pub mod bind;
pub mod compiler;
pub mod context;
pub mod error;
pub mod ir;
pub mod lowering;
pub mod methods;
pub mod pass;
pub mod render;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use compiler::{CompiledChild, CompiledQuery, QueryCompiler};
pub use context::CompileContext;
pub use error::{CompileError, CompileResult};
pub use ir::{Ir, NodeId, NodeKind};
pub use pass::{IrPass, PassManager, PassState};
pub use render::shape::{ShapeArm, ShapeMember};
pub use render::{QueryParameter, ResultShape};
