use dynmerge::convert::{ConversionError, ConversionErrors, Converter};
use dynmerge::core::{ParameterSide, Phase, Record, Severity, TaskCapableNode};
use dynmerge::engine::{InputData, Invocation, Solver, TickContext};
use dynmerge::nodes::ExtendObjectNode;
use dynmerge::observability::{CapturedEvent, RecordingTelemetry};
use dynmerge::params::Access;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn base(name: &str) -> Record {
    let mut record = Record::new();
    record.set("name", json!(name)).unwrap();
    record
}

/// Node with one user slot per nickname, all item access
fn node_with_slots(nicknames: &[&str]) -> ExtendObjectNode {
    let mut node = ExtendObjectNode::new();
    for (i, nickname) in nicknames.iter().enumerate() {
        let schema = node.schema_mut();
        schema.add_slot(ParameterSide::Input, i + 1).unwrap();
        schema.rename(i + 1, *nickname).unwrap();
    }
    node
}

/// Converts numbers after sleeping, so later invocations can finish first
struct SlowConverter {
    total: u64,
    errors: ConversionErrors,
}

impl Converter for SlowConverter {
    fn name(&self) -> &str {
        "slow"
    }

    fn can_convert_to_canonical(&self, value: &Value) -> bool {
        value.is_u64()
    }

    fn convert_to_canonical(&self, value: &Value) -> Result<Value, ConversionError> {
        let n = value.as_u64().unwrap_or_default();
        std::thread::sleep(Duration::from_millis((self.total - n) * 15));
        Ok(json!({ "n": n }))
    }

    fn errors(&self) -> &ConversionErrors {
        &self.errors
    }
}

/// Tracks how many conversions run at the same time
#[derive(Default)]
struct GaugeConverter {
    running: AtomicUsize,
    peak: AtomicUsize,
    errors: ConversionErrors,
}

impl Converter for GaugeConverter {
    fn name(&self) -> &str {
        "gauge"
    }

    fn can_convert_to_canonical(&self, value: &Value) -> bool {
        value.is_u64()
    }

    fn convert_to_canonical(&self, value: &Value) -> Result<Value, ConversionError> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(value.clone())
    }

    fn errors(&self) -> &ConversionErrors {
        &self.errors
    }
}

/// Fails on the string "bad", queues a soft error on "circle"
struct ScriptedConverter {
    errors: ConversionErrors,
}

impl ScriptedConverter {
    fn new() -> Self {
        Self {
            errors: ConversionErrors::new(),
        }
    }
}

impl Converter for ScriptedConverter {
    fn name(&self) -> &str {
        "scripted"
    }

    fn can_convert_to_canonical(&self, value: &Value) -> bool {
        value.is_string()
    }

    fn convert_to_canonical(&self, value: &Value) -> Result<Value, ConversionError> {
        match value.as_str() {
            Some("bad") => Err(ConversionError::new("Conversion failed").with_inner("unsupported value")),
            Some("circle") => {
                self.errors.push(
                    ConversionError::new("Approximated circle").with_inner("converted to polyline"),
                );
                Ok(json!({ "type": "polyline" }))
            }
            Some(other) => Ok(json!({ "type": other })),
            None => Ok(value.clone()),
        }
    }

    fn errors(&self) -> &ConversionErrors {
        &self.errors
    }
}

#[tokio::test]
async fn test_merges_item_and_detached_list() {
    let mut node = node_with_slots(&["Height", "Tags"]);
    {
        let tags = node.schema_mut().slot_mut(2).unwrap();
        tags.access = Access::List;
        tags.detachable = true;
    }

    let mut invocations = vec![Invocation::new(0, Some(base("wall")))
        .with_input(InputData::item(json!(3.5)))
        .with_input(InputData::list(vec![json!("a"), json!("b")]))];

    let ctx = TickContext::new();
    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    let record = outputs[0].as_ref().expect("merged record");
    assert_eq!(record.keys().collect::<Vec<_>>(), vec!["name", "Height", "@Tags"]);
    assert_eq!(record.get("Height"), Some(&json!(3.5)));
    assert_eq!(record.get("@Tags"), Some(&json!(["a", "b"])));
    assert!(ctx.diagnostics.is_empty());
}

#[tokio::test]
async fn test_base_record_is_not_mutated() {
    let mut node = node_with_slots(&["A"]);
    let original = base("wall");
    let mut invocations =
        vec![Invocation::new(0, Some(original.clone())).with_input(InputData::item(json!(1)))];

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &TickContext::new())
        .await
        .unwrap();

    assert!(outputs[0].as_ref().unwrap().contains_key("A"));
    assert_eq!(invocations[0].base.as_ref(), Some(&original));
    assert!(!invocations[0].base.as_ref().unwrap().contains_key("A"));
}

#[tokio::test]
async fn test_single_slot_spawns_nothing() {
    let mut node = ExtendObjectNode::new();
    let mut invocations = vec![Invocation::new(0, Some(base("wall")))];
    let ctx = TickContext::new();

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    assert_eq!(outputs, vec![None]);
    assert!(ctx.diagnostics.is_empty());
    assert_eq!(node.metrics().tasks_spawned(), 0);
    assert_eq!(node.metrics().invocations_skipped(), 1);
}

#[tokio::test]
async fn test_all_optional_is_an_error() {
    let mut node = node_with_slots(&["A", "B"]);
    node.schema_mut().slot_mut(1).unwrap().optional = true;
    node.schema_mut().slot_mut(2).unwrap().optional = true;

    let mut invocations = vec![Invocation::new(0, Some(base("wall")))
        .with_input(InputData::item(json!(1)))
        .with_input(InputData::item(json!(2)))];
    let ctx = TickContext::new();

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    assert_eq!(outputs, vec![None]);
    let diagnostics = ctx.diagnostics.snapshot();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].message, "You cannot set all parameters as optional");
    assert_eq!(node.metrics().tasks_spawned(), 0);
}

#[tokio::test]
async fn test_missing_base_record_fails_silently() {
    let mut node = node_with_slots(&["A"]);
    let mut invocations = vec![
        Invocation::new(0, None).with_input(InputData::item(json!(1))),
        Invocation::new(1, Some(base("second"))).with_input(InputData::item(json!(2))),
    ];
    let ctx = TickContext::new();

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    assert!(outputs[0].is_none());
    let second = outputs[1].as_ref().unwrap();
    assert_eq!(second.get("name"), Some(&json!("second")));
    assert_eq!(second.get("A"), Some(&json!(2)));
    assert!(ctx.diagnostics.is_empty());
}

#[tokio::test]
async fn test_overwrite_emits_one_remark() {
    let mut node = node_with_slots(&["X"]);
    let mut record = base("wall");
    record.set("X", json!("old")).unwrap();

    let mut invocations = vec![Invocation::new(0, Some(record))
        .at(dynmerge::core::BranchPath::new(vec![0, 2]), 5)
        .with_input(InputData::item(json!("new")))];
    let ctx = TickContext::new();

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    let remarks: Vec<_> = ctx
        .diagnostics
        .snapshot()
        .into_iter()
        .filter(|d| d.severity == Severity::Remark)
        .collect();
    assert_eq!(remarks.len(), 1);
    assert!(remarks[0].message.contains("X"));
    assert_eq!(
        remarks[0].message,
        "Key X already exists in object at {0;2}[5], its value will be overwritten"
    );
    assert_eq!(outputs[0].as_ref().unwrap().get("X"), Some(&json!("new")));
}

#[tokio::test]
async fn test_null_item_on_required_slot() {
    let mut node = node_with_slots(&["A", "B"]);
    let mut invocations = vec![Invocation::new(0, Some(base("wall")))
        .with_input(InputData::Item(None))
        .with_input(InputData::item(json!(2)))];
    let ctx = TickContext::new();

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    assert_eq!(outputs, vec![None]);
    let diagnostics = ctx.diagnostics.snapshot();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(diagnostics[0].message, "Non-optional parameter A cannot be null");
}

#[tokio::test]
async fn test_null_item_on_optional_slot_is_stored() {
    let mut node = node_with_slots(&["A", "B"]);
    node.schema_mut().slot_mut(1).unwrap().optional = true;

    let mut invocations = vec![Invocation::new(0, Some(base("wall")))
        .with_input(InputData::Item(None))
        .with_input(InputData::item(json!(2)))];

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &TickContext::new())
        .await
        .unwrap();

    let record = outputs[0].as_ref().unwrap();
    assert_eq!(record.get("A"), Some(&Value::Null));
    assert_eq!(record.get("B"), Some(&json!(2)));
}

#[tokio::test]
async fn test_list_with_null_is_rejected() {
    let mut node = node_with_slots(&["L"]);
    node.schema_mut().slot_mut(1).unwrap().access = Access::List;

    let mut invocations = vec![Invocation::new(0, Some(base("wall")))
        .with_input(InputData::List(vec![Some(json!(1)), None, Some(json!(3))]))];
    let ctx = TickContext::new();

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    assert_eq!(outputs, vec![None]);
    let diagnostics = ctx.diagnostics.snapshot();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(
        diagnostics[0].message,
        "List access parameter L cannot contain null values. Please clean your data tree."
    );
    // The task still ran, it just produced no record
    assert_eq!(node.metrics().tasks_spawned(), 1);
    assert_eq!(node.metrics().tasks_failed(), 1);
}

#[tokio::test]
async fn test_empty_required_list_reports_every_problem() {
    let mut node = node_with_slots(&["L", "I"]);
    node.schema_mut().slot_mut(1).unwrap().access = Access::List;

    let mut invocations = vec![Invocation::new(0, Some(base("wall")))
        .with_input(InputData::List(Vec::new()))
        .with_input(InputData::Item(None))];
    let ctx = TickContext::new();

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    assert_eq!(outputs, vec![None]);
    let messages: Vec<String> = ctx.diagnostics.snapshot().into_iter().map(|d| d.message).collect();
    assert_eq!(
        messages,
        vec![
            "Non-optional parameter L cannot be null or empty.".to_string(),
            "Non-optional parameter I cannot be null".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_tree_slot_is_skipped_silently() {
    let mut node = node_with_slots(&["A", "T"]);
    node.schema_mut().slot_mut(2).unwrap().access = Access::Tree;

    let mut invocations = vec![Invocation::new(0, Some(base("wall")))
        .with_input(InputData::item(json!(1)))
        .with_input(InputData::UnsupportedTree)];
    let ctx = TickContext::new();

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    let record = outputs[0].as_ref().unwrap();
    assert!(record.contains_key("A"));
    assert!(!record.contains_key("T"));
    assert!(ctx.diagnostics.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_outputs_follow_spawn_order() {
    const N: u64 = 6;
    let mut node = node_with_slots(&["A"]);
    let ctx = TickContext::new().with_converter(Arc::new(SlowConverter {
        total: N,
        errors: ConversionErrors::new(),
    }));

    // First invocation sleeps longest, so tasks complete in reverse order
    let mut invocations: Vec<Invocation> = (0..N)
        .map(|i| {
            Invocation::new(i as usize, Some(base(&format!("obj-{}", i))))
                .with_input(InputData::item(json!(i)))
        })
        .collect();

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    for (i, output) in outputs.iter().enumerate() {
        let record = output.as_ref().expect("every invocation produces a record");
        assert_eq!(record.get("name"), Some(&json!(format!("obj-{}", i))));
        assert_eq!(record.get("A"), Some(&json!({ "n": i })));
    }
}

#[tokio::test]
async fn test_partial_merge_is_suppressed() {
    let mut node = node_with_slots(&["A", "B"]);
    let telemetry = RecordingTelemetry::new();
    let ctx = TickContext::new()
        .with_converter(Arc::new(ScriptedConverter::new()))
        .with_telemetry(Arc::new(telemetry.clone()));

    let mut invocations = vec![
        Invocation::new(0, Some(base("first")))
            .with_input(InputData::item(json!("beam")))
            .with_input(InputData::item(json!("bad"))),
        Invocation::new(1, Some(base("second")))
            .with_input(InputData::item(json!("beam")))
            .with_input(InputData::item(json!("column"))),
    ];

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    assert!(outputs[0].is_none());
    let second = outputs[1].as_ref().unwrap();
    assert_eq!(second.get("A"), Some(&json!({ "type": "beam" })));
    assert_eq!(second.get("B"), Some(&json!({ "type": "column" })));

    let errors: Vec<String> = ctx
        .diagnostics
        .snapshot()
        .into_iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message)
        .collect();
    assert_eq!(errors, vec!["Conversion failed: unsupported value".to_string()]);
    assert!(matches!(
        telemetry.events().as_slice(),
        [CapturedEvent::Error { context, .. }] if context == "B"
    ));
}

#[tokio::test]
async fn test_conversion_errors_become_warnings() {
    let mut node = node_with_slots(&["Curves"]);
    node.schema_mut().slot_mut(1).unwrap().access = Access::List;
    let converter = Arc::new(ScriptedConverter::new());
    let ctx = TickContext::new().with_converter(converter.clone());

    let mut invocations = vec![Invocation::new(0, Some(base("sketch")))
        .with_input(InputData::list(vec![json!("line"), json!("circle")]))];

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    assert!(outputs[0].is_some());
    let warnings: Vec<String> = ctx
        .diagnostics
        .snapshot()
        .into_iter()
        .filter(|d| d.severity == Severity::Warning)
        .map(|d| d.message)
        .collect();
    assert_eq!(
        warnings,
        vec!["Approximated circle: converted to polyline".to_string()]
    );
    assert!(converter.errors().is_empty());
}

#[tokio::test]
async fn test_list_conversion_failure_warns_and_drops_result() {
    let mut node = node_with_slots(&["L"]);
    node.schema_mut().slot_mut(1).unwrap().access = Access::List;
    let ctx = TickContext::new().with_converter(Arc::new(ScriptedConverter::new()));

    let mut invocations = vec![Invocation::new(0, Some(base("wall")))
        .with_input(InputData::list(vec![json!("ok"), json!("bad")]))];

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    assert_eq!(outputs, vec![None]);
    assert_eq!(ctx.diagnostics.count(Severity::Warning), 1);
    assert_eq!(ctx.diagnostics.count(Severity::Error), 0);
}

#[tokio::test]
async fn test_panicking_converter_is_contained() {
    struct Panics(ConversionErrors);

    impl Converter for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        fn can_convert_to_canonical(&self, value: &Value) -> bool {
            value == &json!("explode")
        }

        fn convert_to_canonical(&self, _value: &Value) -> Result<Value, ConversionError> {
            panic!("converter exploded")
        }

        fn errors(&self) -> &ConversionErrors {
            &self.0
        }
    }

    let mut node = node_with_slots(&["A"]);
    let ctx = TickContext::new().with_converter(Arc::new(Panics(ConversionErrors::new())));
    let mut invocations = vec![
        Invocation::new(0, Some(base("first"))).with_input(InputData::item(json!("explode"))),
        Invocation::new(1, Some(base("second"))).with_input(InputData::item(json!("fine"))),
    ];

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    assert!(outputs[0].is_none());
    assert_eq!(outputs[1].as_ref().unwrap().get("A"), Some(&json!("fine")));
    let errors: Vec<String> = ctx
        .diagnostics
        .snapshot()
        .into_iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message)
        .collect();
    assert_eq!(errors, vec!["unexpected failure: converter exploded".to_string()]);
}

#[tokio::test]
async fn test_identical_ticks_are_idempotent() {
    let mut node = node_with_slots(&["A", "B"]);
    node.schema_mut().slot_mut(2).unwrap().access = Access::List;
    let ctx = TickContext::new().with_converter(Arc::new(ScriptedConverter::new()));

    let mut invocations = vec![
        Invocation::new(0, Some(base("first")))
            .with_input(InputData::item(json!("beam")))
            .with_input(InputData::list(vec![json!("a"), json!("b")])),
        Invocation::new(1, Some(base("second")))
            .with_input(InputData::item(json!(7)))
            .with_input(InputData::list(vec![json!("c")])),
    ];

    let mut solver = Solver::new();
    let first = solver.solve_outputs(&mut node, &mut invocations, &ctx).await.unwrap();
    let second = solver.solve_outputs(&mut node, &mut invocations, &ctx).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(solver.ticks(), 2);
    for (a, b) in first.iter().zip(second.iter()) {
        let (a, b) = (a.as_ref().unwrap(), b.as_ref().unwrap());
        assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_spawn_after_collect_starts_a_new_tick() {
    let mut node = node_with_slots(&["A"]);
    let ctx = TickContext::new();

    for tick in 0..2 {
        let mut invocation =
            Invocation::new(0, Some(base("wall"))).with_input(InputData::item(json!(tick)));

        node.solve_instance(Phase::Spawn, &mut invocation, &ctx).await.unwrap();
        assert_eq!(node.pending_tasks(), 1);
        node.solve_instance(Phase::Collect, &mut invocation, &ctx).await.unwrap();

        assert_eq!(invocation.output.unwrap().get("A"), Some(&json!(tick)));
    }
}

#[tokio::test]
async fn test_collect_without_spawn_is_a_no_op() {
    let mut node = node_with_slots(&["A"]);
    let mut invocation = Invocation::new(0, Some(base("wall"))).with_input(InputData::item(json!(1)));

    node.solve_instance(Phase::Collect, &mut invocation, &TickContext::new())
        .await
        .unwrap();

    assert!(invocation.output.is_none());
}

#[tokio::test]
async fn test_config_is_applied() {
    let mut node = ExtendObjectNode::new();
    node.on_create(json!({ "nickname_pool": "XYZ", "max_concurrent_tasks": 1 }))
        .await
        .unwrap();

    assert_eq!(node.config().max_concurrent_tasks, Some(1));
    let slot = node.schema_mut().add_slot(ParameterSide::Input, 1).unwrap();
    assert_eq!(slot.name, "X");

    // A limit of one task still resolves every invocation
    let mut invocations: Vec<Invocation> = (0..3)
        .map(|i| Invocation::new(i, Some(base("wall"))).with_input(InputData::item(json!(i))))
        .collect();
    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &TickContext::new())
        .await
        .unwrap();
    assert!(outputs.iter().all(Option::is_some));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_max_concurrent_tasks_bounds_running_merges() {
    let mut node = node_with_slots(&["A"]);
    node.on_create(json!({ "max_concurrent_tasks": 2 })).await.unwrap();

    let gauge = Arc::new(GaugeConverter::default());
    let ctx = TickContext::new().with_converter(gauge.clone());
    let mut invocations: Vec<Invocation> = (0..8)
        .map(|i| Invocation::new(i, Some(base("wall"))).with_input(InputData::item(json!(i))))
        .collect();

    let outputs = Solver::new()
        .solve_outputs(&mut node, &mut invocations, &ctx)
        .await
        .unwrap();

    for (i, output) in outputs.iter().enumerate() {
        assert_eq!(output.as_ref().and_then(|r| r.get("A")), Some(&json!(i)));
    }
    let peak = gauge.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak concurrency was {}", peak);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut node = ExtendObjectNode::new();
    tokio_test::assert_err!(node.on_create(json!({ "max_concurrent_tasks": 0 })).await);
    tokio_test::assert_err!(node.on_create(json!({ "unknown": true })).await);
    tokio_test::assert_ok!(node.on_create(Value::Null).await);
}
