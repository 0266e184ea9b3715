use super::{DataAccess, Invocation, TickContext};
use crate::core::{Phase, Record, TaskCapableNode};
use anyhow::Result;
use tracing::Instrument;

/// Drives a task-capable node through whole ticks.
///
/// Every invocation runs the spawn phase before any invocation runs the collect
/// phase, and a tick finishes collecting before the next one starts.
pub struct Solver {
    ticks: u64,
}

impl Solver {
    pub fn new() -> Self {
        Self { ticks: 0 }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick over `invocations`.
    ///
    /// A failed collect does not stop the remaining invocations from collecting;
    /// the first such error is returned once the tick is over.
    pub async fn solve_tick<A: DataAccess>(
        &mut self,
        node: &mut dyn TaskCapableNode,
        invocations: &mut [A],
        ctx: &TickContext,
    ) -> Result<()> {
        self.ticks += 1;
        let span = tracing::debug_span!("tick", tick = self.ticks, invocations = invocations.len());

        async move {
            node.before_solve();

            for invocation in invocations.iter_mut() {
                node.solve_instance(Phase::Spawn, invocation, ctx).await?;
            }

            let mut first_error = None;
            for invocation in invocations.iter_mut() {
                let iteration = invocation.iteration();
                if let Err(e) = node.solve_instance(Phase::Collect, invocation, ctx).await {
                    tracing::warn!(iteration, error = %e, "collect failed");
                    first_error.get_or_insert(e);
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok::<(), anyhow::Error>(()),
            }
        }
        .instrument(span)
        .await
    }

    /// Run a tick and return each invocation's output, in invocation order
    pub async fn solve_outputs(
        &mut self,
        node: &mut dyn TaskCapableNode,
        invocations: &mut [Invocation],
        ctx: &TickContext,
    ) -> Result<Vec<Option<Record>>> {
        for invocation in invocations.iter_mut() {
            invocation.output = None;
        }
        self.solve_tick(node, invocations, ctx).await?;
        Ok(invocations.iter().map(|i| i.output.clone()).collect())
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}
