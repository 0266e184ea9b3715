use crate::core::{BranchPath, Record};
use anyhow::{anyhow, Result};
use serde_json::Value;

/// Data a slot delivers for one invocation, by access kind
#[derive(Debug, Clone, PartialEq)]
pub enum InputData {
    Item(Option<Value>),
    List(Vec<Option<Value>>),
    UnsupportedTree,
}

impl InputData {
    pub fn item(value: Value) -> Self {
        Self::Item(Some(value))
    }

    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Self::List(values.into_iter().map(Some).collect())
    }
}

/// Per-invocation view of the node's inputs and outputs provided by the host
pub trait DataAccess: Send {
    /// Zero-based index of this invocation within the tick
    fn iteration(&self) -> usize;

    fn get_record(&self, index: usize) -> Option<Record>;

    fn get_item(&self, index: usize) -> Option<Value>;

    fn get_list(&self, index: usize) -> Vec<Option<Value>>;

    /// Branch of the data tree the given input is matched against
    fn target_path(&self, index: usize) -> BranchPath;

    /// Item index within `target_path` the given input is matched against
    fn target_index(&self, index: usize) -> usize;

    fn set_record(&mut self, index: usize, record: Record) -> Result<()>;
}

/// In-memory invocation used by hosts that hold all their data up front
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub iteration: usize,
    pub path: BranchPath,
    pub index: usize,
    pub base: Option<Record>,
    /// Data for slots 1.. (slot 0 is `base`)
    pub inputs: Vec<InputData>,
    pub output: Option<Record>,
}

impl Invocation {
    pub fn new(iteration: usize, base: Option<Record>) -> Self {
        Self {
            iteration,
            path: BranchPath::new(vec![0]),
            index: iteration,
            base,
            inputs: Vec::new(),
            output: None,
        }
    }

    pub fn at(mut self, path: BranchPath, index: usize) -> Self {
        self.path = path;
        self.index = index;
        self
    }

    pub fn with_input(mut self, data: InputData) -> Self {
        self.inputs.push(data);
        self
    }

    fn input(&self, index: usize) -> Option<&InputData> {
        index.checked_sub(1).and_then(|i| self.inputs.get(i))
    }
}

impl DataAccess for Invocation {
    fn iteration(&self) -> usize {
        self.iteration
    }

    fn get_record(&self, index: usize) -> Option<Record> {
        if index == 0 {
            self.base.clone()
        } else {
            None
        }
    }

    fn get_item(&self, index: usize) -> Option<Value> {
        match self.input(index) {
            Some(InputData::Item(value)) => value.clone().filter(|v| !v.is_null()),
            Some(InputData::List(values)) => values.first().cloned().flatten(),
            _ => None,
        }
    }

    fn get_list(&self, index: usize) -> Vec<Option<Value>> {
        match self.input(index) {
            Some(InputData::List(values)) => values
                .iter()
                .map(|v| v.clone().filter(|v| !v.is_null()))
                .collect(),
            Some(InputData::Item(value)) => vec![value.clone().filter(|v| !v.is_null())],
            _ => Vec::new(),
        }
    }

    fn target_path(&self, _index: usize) -> BranchPath {
        self.path.clone()
    }

    fn target_index(&self, _index: usize) -> usize {
        self.index
    }

    fn set_record(&mut self, index: usize, record: Record) -> Result<()> {
        if index != 0 {
            return Err(anyhow!("Output index {} does not exist", index));
        }
        self.output = Some(record);
        Ok(())
    }
}
