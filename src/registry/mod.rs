pub mod metadata;

pub use metadata::{
    all, find, NodeFactory, NodeMetadata, NodeMetadataFactory, NodeMetadataFactoryWrapper,
    PortMetadata,
};
