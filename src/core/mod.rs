pub mod diagnostics;
pub mod node;
pub mod path;
pub mod record;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use node::{ParameterSide, Phase, TaskCapableNode, VariableParameterNode};
pub use path::BranchPath;
pub use record::{Record, RecordError};
