//! Extend Object: merges any number of user-defined inputs into a copy of a record.
//!
//! Each tick runs in two phases. During [`Phase::Spawn`] the node reads every input
//! slot, validates the values and spawns one merge task per invocation without
//! waiting for it. During [`Phase::Collect`] it resolves those tasks one by one, in
//! spawn order, and writes each merged record to the output.

use crate::convert::{try_convert_item, ConversionError, Converter};
use crate::core::{
    Diagnostics, ParameterSide, Phase, Record, TaskCapableNode, VariableParameterNode,
};
use crate::engine::{DataAccess, InputData, TaskList, TickContext};
use crate::observability::{NodeMetrics, Telemetry};
use crate::params::{Access, InputSlot, SlotSchema, DEFAULT_NICKNAME_POOL};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use dynmerge_macros::NodeComponent;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

pub const BASE_SLOT: usize = 0;
pub const OUTPUT_SLOT: usize = 0;

/// Derived key → slot data for one invocation, in slot order
pub type InvocationMapping = IndexMap<String, InputData>;

type MergeOutcome = std::result::Result<Option<Record>, JoinError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtendObjectConfig {
    /// Letters used to name new input slots
    pub nickname_pool: String,
    /// Upper bound on merge tasks running at once; unbounded when absent
    pub max_concurrent_tasks: Option<usize>,
}

impl Default for ExtendObjectConfig {
    fn default() -> Self {
        Self {
            nickname_pool: DEFAULT_NICKNAME_POOL.to_string(),
            max_concurrent_tasks: None,
        }
    }
}

#[derive(NodeComponent)]
#[node_meta(
    id = "7f1c2a64-5b0e-4d8e-9a3c-1e6b2f0d4c91",
    name = "Extend Object",
    nickname = "EO",
    description = "Allows you to extend an object by setting its keys and values.",
    category = "Objects",
    subcategory = "Records"
)]
pub struct ExtendObjectNode {
    #[input(name = "Object", nickname = "O", description = "Object to extend with the values of the other inputs.")]
    _object: (),

    #[output(name = "Object", nickname = "O", description = "Extended copy of the object.")]
    _extended: (),

    config: ExtendObjectConfig,
    schema: SlotSchema,
    tasks: TaskList<MergeOutcome>,
    semaphore: Option<Arc<Semaphore>>,
    metrics: Arc<NodeMetrics>,
    collecting: bool,
}

impl Default for ExtendObjectNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtendObjectNode {
    pub fn new() -> Self {
        Self {
            _object: (),
            _extended: (),
            config: ExtendObjectConfig::default(),
            schema: SlotSchema::new(base_slot()),
            tasks: TaskList::new(),
            semaphore: None,
            metrics: Arc::new(NodeMetrics::new("extend_object")),
            collecting: false,
        }
    }

    pub fn config(&self) -> &ExtendObjectConfig {
        &self.config
    }

    pub fn schema(&self) -> &SlotSchema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut SlotSchema {
        &mut self.schema
    }

    pub fn metrics(&self) -> Arc<NodeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of task slots pushed during the current tick
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    fn spawn(&mut self, access: &dyn DataAccess, ctx: &TickContext) {
        match self.prepare(access, &ctx.diagnostics) {
            Some((record, mapping)) => {
                tracing::trace!(iteration = access.iteration(), "spawning merge task");
                self.spawn_merge(record, mapping, ctx);
            }
            None => {
                tracing::trace!(iteration = access.iteration(), "nothing to merge");
                self.tasks.push_skipped();
                self.metrics.record_skipped();
            }
        }
    }

    /// Copy the base record and collect the slot values to merge into it.
    ///
    /// Returns `None` when no task should run at all. A `None` mapping means the
    /// inputs failed validation and the task must not produce a record.
    fn prepare(
        &self,
        access: &dyn DataAccess,
        diagnostics: &Diagnostics,
    ) -> Option<(Record, Option<InvocationMapping>)> {
        let record = access.get_record(BASE_SLOT)?.shallow_copy();

        if self.schema.len() == 1 {
            return None;
        }

        if self.schema.all_user_slots_optional() {
            diagnostics.error("You cannot set all parameters as optional");
            return None;
        }

        let (mapping, has_errors) = self.collect_inputs(&record, access, diagnostics);
        Some((record, (!has_errors).then_some(mapping)))
    }

    fn collect_inputs(
        &self,
        record: &Record,
        access: &dyn DataAccess,
        diagnostics: &Diagnostics,
    ) -> (InvocationMapping, bool) {
        let mut mapping = InvocationMapping::new();
        let mut has_errors = false;

        for (index, slot) in self.schema.user_slots() {
            let key = slot.derived_key();

            if record.contains_key(&key) {
                diagnostics.remark(format!(
                    "Key {} already exists in object at {}[{}], its value will be overwritten",
                    key,
                    access.target_path(BASE_SLOT),
                    access.target_index(BASE_SLOT)
                ));
            }

            match slot.access {
                Access::Item => {
                    let value = access.get_item(index);
                    if !slot.optional && value.is_none() {
                        diagnostics.warning(format!(
                            "Non-optional parameter {} cannot be null",
                            slot.nickname
                        ));
                        has_errors = true;
                    }
                    mapping.insert(key, InputData::Item(value));
                }
                Access::List => {
                    let values = access.get_list(index);
                    if !slot.optional && values.is_empty() {
                        diagnostics.warning(format!(
                            "Non-optional parameter {} cannot be null or empty.",
                            slot.nickname
                        ));
                        has_errors = true;
                    }
                    if values.iter().any(Option::is_none) {
                        diagnostics.warning(format!(
                            "List access parameter {} cannot contain null values. Please clean your data tree.",
                            slot.nickname
                        ));
                        has_errors = true;
                    }
                    mapping.insert(key, InputData::List(values));
                }
                Access::Tree => {
                    tracing::trace!(slot = %slot.nickname, "tree access is not supported, skipping");
                }
            }
        }

        (mapping, has_errors)
    }

    fn spawn_merge(&mut self, record: Record, mapping: Option<InvocationMapping>, ctx: &TickContext) {
        let diagnostics = ctx.diagnostics.clone();
        let converter = ctx.converter.clone();
        let telemetry = Arc::clone(&ctx.telemetry);
        let metrics = Arc::clone(&self.metrics);
        let semaphore = self.semaphore.clone();

        let handle = tokio::spawn(async move {
            let _permit = match semaphore {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };

            tokio::task::spawn_blocking(move || {
                let start = metrics.start_processing();
                let result = run_merge_task(
                    record,
                    mapping,
                    converter.as_deref(),
                    &diagnostics,
                    telemetry.as_ref(),
                );
                metrics.finish_processing(start);
                if result.is_some() {
                    metrics.record_succeeded();
                } else {
                    metrics.record_failed();
                }
                result
            })
            .await
        });

        self.tasks.push_spawned(handle);
        self.metrics.record_spawned();
    }

    async fn collect(&mut self, access: &mut dyn DataAccess, ctx: &TickContext) -> Result<()> {
        report_conversion_errors(ctx);

        // Solving without tasks is not supported by this node
        if !self.tasks.has_tasks() {
            return Ok(());
        }

        let resolved = self.tasks.resolve_next().await;

        // Last task of the tick: nothing may be left queued for the next one
        if self.tasks.is_exhausted() {
            report_conversion_errors(ctx);
        }

        let Some(resolved) = resolved else {
            return Ok(());
        };

        let result = match resolved {
            Ok(Ok(result)) => result,
            Ok(Err(e)) | Err(e) => {
                let message = join_error_message(e);
                ctx.telemetry.capture_fault("merge task", &message);
                ctx.diagnostics
                    .error(format!("unexpected failure: {}", message));
                None
            }
        };

        if let Some(record) = result {
            access
                .set_record(OUTPUT_SLOT, record)
                .context("Failed to set merged object on output")?;
        }

        Ok(())
    }
}

#[async_trait]
impl TaskCapableNode for ExtendObjectNode {
    async fn on_create(&mut self, config: Value) -> Result<()> {
        let config: ExtendObjectConfig = if config.is_null() {
            ExtendObjectConfig::default()
        } else {
            serde_json::from_value(config).context("Invalid Extend Object configuration")?
        };

        self.semaphore = match config.max_concurrent_tasks {
            Some(0) => bail!("max_concurrent_tasks must be at least 1"),
            Some(limit) => Some(Arc::new(Semaphore::new(limit))),
            None => None,
        };
        self.schema.set_nickname_pool(config.nickname_pool.clone());
        self.config = config;
        Ok(())
    }

    fn before_solve(&mut self) {
        self.tasks.clear();
        self.collecting = false;
    }

    async fn solve_instance(
        &mut self,
        phase: Phase,
        access: &mut dyn DataAccess,
        ctx: &TickContext,
    ) -> Result<()> {
        match phase {
            Phase::Spawn => {
                // A spawn after collecting means the host skipped before_solve
                if self.collecting {
                    self.before_solve();
                }
                self.spawn(access, ctx);
                Ok(())
            }
            Phase::Collect => {
                self.collecting = true;
                self.collect(access, ctx).await
            }
        }
    }
}

impl VariableParameterNode for ExtendObjectNode {
    fn can_insert_parameter(&self, side: ParameterSide, index: usize) -> bool {
        self.schema.can_insert(side, index)
    }

    fn can_remove_parameter(&self, side: ParameterSide, index: usize) -> bool {
        self.schema.can_remove(side, index)
    }

    fn create_parameter(&mut self, side: ParameterSide, index: usize) -> InputSlot {
        self.schema.create_slot(side, index)
    }

    fn destroy_parameter(&mut self, side: ParameterSide, index: usize) -> bool {
        self.schema.destroy(side, index)
    }

    fn variable_parameter_maintenance(&mut self) {
        self.schema.maintenance();
    }
}

fn report_conversion_errors(ctx: &TickContext) {
    if let Some(converter) = &ctx.converter {
        for error in converter.errors().drain() {
            ctx.diagnostics.warning(error.report());
        }
    }
}

fn base_slot() -> InputSlot {
    InputSlot::new("Object", "O")
        .with_description("Object to extend with the values of the other inputs.")
}

/// Merge task entry point. Panics never escape: they become an error
/// diagnostic and an empty result.
pub fn run_merge_task(
    record: Record,
    mapping: Option<InvocationMapping>,
    converter: Option<&dyn Converter>,
    diagnostics: &Diagnostics,
    telemetry: &dyn Telemetry,
) -> Option<Record> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        merge_into_record(record, mapping, converter, diagnostics, telemetry)
    }));

    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            telemetry.capture_fault("merge task", &message);
            diagnostics.error(format!("unexpected failure: {}", message));
            None
        }
    }
}

/// Convert every mapped value and write it onto `record`.
///
/// Any failure on any key discards the whole record: partial merges are never
/// returned. Every key is still processed so all problems get reported.
pub fn merge_into_record(
    mut record: Record,
    mapping: Option<InvocationMapping>,
    converter: Option<&dyn Converter>,
    diagnostics: &Diagnostics,
    telemetry: &dyn Telemetry,
) -> Option<Record> {
    let mapping = mapping?;
    let mut has_errors = false;

    for (key, data) in mapping {
        match data {
            InputData::List(values) => {
                let converted = match convert_list(&values, converter) {
                    Ok(list) => Value::Array(list),
                    Err(e) => {
                        telemetry.capture_error(&key, &e);
                        diagnostics.warning(e.report());
                        has_errors = true;
                        Value::Null
                    }
                };

                if let Err(e) = record.set(&key, converted) {
                    telemetry.capture_error(&key, &e);
                    diagnostics.error(e.to_string());
                    has_errors = true;
                }
            }
            InputData::Item(value) => {
                let converted = match (converter, value) {
                    (Some(converter), Some(value)) => try_convert_item(&value, converter),
                    (_, value) => Ok(value.unwrap_or(Value::Null)),
                };

                let assigned = match converted {
                    Ok(value) => record.set(&key, value).map_err(|e| {
                        telemetry.capture_error(&key, &e);
                        e.to_string()
                    }),
                    Err(e) => {
                        telemetry.capture_error(&key, &e);
                        Err(e.report())
                    }
                };

                if let Err(message) = assigned {
                    diagnostics.error(message);
                    has_errors = true;
                }
            }
            InputData::UnsupportedTree => {}
        }
    }

    (!has_errors).then_some(record)
}

/// All-or-nothing: one failing element fails the whole list
fn convert_list(
    values: &[Option<Value>],
    converter: Option<&dyn Converter>,
) -> std::result::Result<Vec<Value>, ConversionError> {
    values
        .iter()
        .map(|value| match (converter, value) {
            (Some(converter), Some(value)) => try_convert_item(value, converter),
            (_, value) => Ok(value.clone().unwrap_or(Value::Null)),
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn join_error_message(error: JoinError) -> String {
    if error.is_panic() {
        panic_message(error.into_panic().as_ref())
    } else {
        error.to_string()
    }
}
