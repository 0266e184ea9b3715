pub mod extend_object;

pub use extend_object::{ExtendObjectConfig, ExtendObjectNode, InvocationMapping};
