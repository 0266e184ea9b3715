use crate::core::TaskCapableNode;
use crate::params::Access;
use serde::{Deserialize, Serialize};

/// Metadata describing a statically declared port (input or output)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMetadata {
    pub id: String,
    pub name: String,
    pub nickname: String,
    pub description: String,
    pub access: Access,
}

/// Factory function type for creating node instances
pub type NodeFactory = fn() -> Box<dyn TaskCapableNode>;

/// Complete metadata for a node type
#[derive(Clone)]
pub struct NodeMetadata {
    /// Stable component id, never shown to users
    pub id: String,
    pub name: String,
    pub nickname: String,
    pub description: String,
    pub category: String,
    pub subcategory: String,
    pub inputs: Vec<PortMetadata>,
    pub outputs: Vec<PortMetadata>,
    pub factory: NodeFactory,
}

impl NodeMetadata {
    /// Create a new instance of this node type
    pub fn create_instance(&self) -> Box<dyn TaskCapableNode> {
        (self.factory)()
    }
}

impl std::fmt::Debug for NodeMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMetadata")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("nickname", &self.nickname)
            .field("category", &self.category)
            .field("subcategory", &self.subcategory)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

// Factory type for creating node metadata at runtime
pub type NodeMetadataFactory = fn() -> NodeMetadata;

// Wrapper for inventory collection
pub struct NodeMetadataFactoryWrapper(pub NodeMetadataFactory);

// Inventory submission type
inventory::collect!(NodeMetadataFactoryWrapper);

/// Metadata of every node type linked into the binary
pub fn all() -> Vec<NodeMetadata> {
    inventory::iter::<NodeMetadataFactoryWrapper>
        .into_iter()
        .map(|wrapper| (wrapper.0)())
        .collect()
}

pub fn find(id: &str) -> Option<NodeMetadata> {
    all().into_iter().find(|meta| meta.id.eq_ignore_ascii_case(id))
}
