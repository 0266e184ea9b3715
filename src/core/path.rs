use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a data branch in the host's data tree, rendered as `{0;1;2}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchPath(pub Vec<u32>);

impl BranchPath {
    pub fn new(indices: impl Into<Vec<u32>>) -> Self {
        Self(indices.into())
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{{{}}}", parts.join(";"))
    }
}
