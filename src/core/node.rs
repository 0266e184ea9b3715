use crate::engine::{DataAccess, TickContext};
use crate::params::InputSlot;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which half of a tick the host is driving.
///
/// `Spawn` runs once per invocation and must not block; `Collect` runs once per
/// invocation after every spawn of the tick has happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Spawn,
    Collect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterSide {
    Input,
    Output,
}

/// Base trait for nodes that offload their work to background tasks
#[async_trait]
pub trait TaskCapableNode: Send + Sync {
    /// Called once when node is instantiated with config from JSON
    async fn on_create(&mut self, config: Value) -> Result<()>;

    /// Called by the host before the first invocation of a tick
    fn before_solve(&mut self) {}

    /// Called once per invocation and phase
    async fn solve_instance(
        &mut self,
        phase: Phase,
        access: &mut dyn DataAccess,
        ctx: &TickContext,
    ) -> Result<()>;
}

/// Editor hooks for nodes whose inputs can be added and removed by the user
pub trait VariableParameterNode {
    fn can_insert_parameter(&self, side: ParameterSide, index: usize) -> bool;

    fn can_remove_parameter(&self, side: ParameterSide, index: usize) -> bool;

    fn create_parameter(&mut self, side: ParameterSide, index: usize) -> InputSlot;

    fn destroy_parameter(&mut self, side: ParameterSide, index: usize) -> bool;

    fn variable_parameter_maintenance(&mut self);
}
