use stripsrs::{
    PlanVisualizer, Planner, PlannerConfig, ProducerDescriptor, ResourceDescriptor, ResourceId,
    ResourceKind, Result, Snapshot, UnitId, WorkerDescriptor,
};

fn main() -> Result<()> {
    env_logger::init();

    // Two peasants, a town hall and a handful of deposits around it
    let snapshot = Snapshot {
        workers: vec![
            WorkerDescriptor::new(UnitId(1), 400, 0),
            WorkerDescriptor::new(UnitId(2), 400, 0),
        ],
        producer: Some(ProducerDescriptor::new(UnitId(3), 400, 0)),
        resources: vec![
            ResourceDescriptor::new(ResourceId(10), ResourceKind::Gold, 8.0, 1000),
            ResourceDescriptor::new(ResourceId(11), ResourceKind::Gold, 14.5, 5000),
            ResourceDescriptor::new(ResourceId(20), ResourceKind::Wood, 4.0, 300),
            ResourceDescriptor::new(ResourceId(21), ResourceKind::Wood, 6.5, 400),
        ],
        required_gold: 300,
        required_wood: 400,
        ..Snapshot::default()
    };

    let planner = Planner::new(PlannerConfig::default());
    let initial = planner.initial_state(&snapshot)?;
    let plan = planner.plan(&snapshot)?;

    println!(
        "Found plan with {} rounds and cost {} ({} states expanded)",
        plan.len(),
        plan.cost(),
        plan.expanded()
    );

    let visualizer = PlanVisualizer::new();
    visualizer.describe(&initial, &plan, &mut std::io::stdout())?;
    visualizer.visualize_plan(&initial, &plan, "small_economy.dot")?;
    println!("Plan graph written to small_economy.dot");

    Ok(())
}
