use dynmerge::core::{ParameterSide, Record, TaskCapableNode};
use dynmerge::engine::{InputData, Invocation, Solver, TickContext};
use dynmerge::nodes::ExtendObjectNode;
use dynmerge::observability::{setup, HostApplication, MetricsCollector, NodeMonitor};
use dynmerge::params::Access;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup::init(&HostApplication::detect());

    println!("Extend Object - Demo");
    println!("====================\n");

    let mut node = ExtendObjectNode::new();
    node.on_create(serde_json::json!({ "max_concurrent_tasks": 4 })).await?;

    // User adds two inputs: an item "Height" and a detached list "Tags"
    let schema = node.schema_mut();
    schema.add_slot(ParameterSide::Input, 1)?;
    schema.rename(1, "Height")?;
    schema.add_slot(ParameterSide::Input, 2)?;
    schema.rename(2, "Tags")?;
    {
        let tags = schema.slot_mut(2)?;
        tags.access = Access::List;
        tags.detachable = true;
    }

    let mut invocations: Vec<Invocation> = (0..3)
        .map(|i| -> anyhow::Result<Invocation> {
            let mut base = Record::new();
            base.set("name", serde_json::json!(format!("wall-{}", i)))?;
            Ok(Invocation::new(i, Some(base))
                .with_input(InputData::item(serde_json::json!(3.0 + i as f64)))
                .with_input(InputData::list(vec![
                    serde_json::json!("structural"),
                    serde_json::json!(format!("level-{}", i)),
                ])))
        })
        .collect::<anyhow::Result<_>>()?;

    let ctx = TickContext::new();
    let mut solver = Solver::new();
    let outputs = solver.solve_outputs(&mut node, &mut invocations, &ctx).await?;

    for (i, output) in outputs.iter().enumerate() {
        match output {
            Some(record) => println!("[{}] {}", i, record.to_json()),
            None => println!("[{}] <no value>", i),
        }
    }

    for diagnostic in ctx.diagnostics.snapshot() {
        println!("{}: {}", diagnostic.severity, diagnostic.message);
    }

    let mut collector = MetricsCollector::new();
    collector.register("extend_object", node.metrics());
    println!("\n{}", NodeMonitor::new(collector).generate_report());

    Ok(())
}
