use serde::{Deserialize, Serialize};

/// How an input slot reads its data for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    Item,
    List,
    /// Multi-branch data. Accepted on the slot but never read by the merge node.
    Tree,
}

/// A named input position on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSlot {
    pub name: String,
    pub nickname: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub optional: bool,
    /// Store the value as a detached sub-structure (`@` key prefix)
    #[serde(default)]
    pub detachable: bool,
    #[serde(default)]
    pub mutable_nickname: bool,
}

impl InputSlot {
    pub fn new(name: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nickname: nickname.into(),
            description: String::new(),
            access: Access::Item,
            optional: false,
            detachable: false,
            mutable_nickname: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn detachable(mut self, detachable: bool) -> Self {
        self.detachable = detachable;
        self
    }

    pub fn mutable_nickname(mut self, mutable: bool) -> Self {
        self.mutable_nickname = mutable;
        self
    }

    /// Key this slot writes into the record
    pub fn derived_key(&self) -> String {
        if self.detachable {
            format!("@{}", self.nickname)
        } else {
            self.nickname.clone()
        }
    }
}
