//! # Visualizer Module
//!
//! Turns a found [`Plan`] into a Graphviz DOT graph or into the directive
//! sentences an executor would log for each round.

use std::fs::File;
use std::io::{BufWriter, Write};

use crate::action::Action;
use crate::error::Result;
use crate::resource::ResourceKind;
use crate::search::Plan;
use crate::world_state::WorldState;

/// Renders plans as Graphviz DOT graphs and as readable directives.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanVisualizer;

impl PlanVisualizer {
    pub fn new() -> Self {
        Self
    }

    /// Generate a DOT file visualization of a plan
    pub fn visualize_plan(&self, initial: &WorldState, plan: &Plan, filename: &str) -> Result<()> {
        let mut file = BufWriter::new(File::create(filename)?);
        self.render_dot(initial, plan, &mut file)?;
        file.flush()?;
        Ok(())
    }

    /// Writes one node per round, chained from the initial state.
    pub fn render_dot<W: Write>(&self, initial: &WorldState, plan: &Plan, out: &mut W) -> Result<()> {
        writeln!(out, "digraph STRIPS {{")?;
        writeln!(out, "    rankdir=LR;")?;
        writeln!(out, "    node [shape=box, style=filled, fillcolor=lightblue];")?;
        writeln!(out, "    edge [fontsize=10];")?;

        writeln!(
            out,
            "    initial [label=\"Initial State\\n{}\", fillcolor=lightgreen];",
            Self::state_label(initial)
        )?;

        let mut previous = "initial".to_string();
        for (i, step) in plan.steps().iter().enumerate() {
            let node = format!("round_{}", i + 1);
            let commands: Vec<String> = step.action.commands().map(|a| a.to_string()).collect();
            let label = if commands.is_empty() {
                "wait".to_string()
            } else {
                commands.join("\\n")
            };
            writeln!(
                out,
                "    {} [label=\"Round {}\\n{}\\nCost: {}\"];",
                node,
                i + 1,
                label,
                step.cost_so_far
            )?;
            writeln!(out, "    {} -> {};", previous, node)?;
            previous = node;
        }

        let goal = initial.resources().goal();
        let targets: Vec<String> = goal
            .criteria()
            .map(|c| format!("{}: {}", c.id(), c.objective()))
            .collect();
        writeln!(
            out,
            "    goal [label=\"Goal State\\n{}\", fillcolor=lightpink];",
            targets.join("\\n")
        )?;
        writeln!(out, "    edge [color=red, penwidth=2.0];")?;
        writeln!(out, "    {} -> goal [label=\"total {}\"];", previous, plan.cost())?;

        writeln!(out, "}}")?;
        Ok(())
    }

    /// Writes the plan as the sentences an executor would log, one round per
    /// block. Idle members are left out.
    pub fn describe<W: Write>(&self, initial: &WorldState, plan: &Plan, out: &mut W) -> Result<()> {
        if plan.is_empty() {
            writeln!(out, "Goal already met.")?;
            return Ok(());
        }
        for (i, step) in plan.steps().iter().enumerate() {
            writeln!(out, "Round {} (cost {}):", i + 1, step.cost_so_far)?;
            for action in step.action.commands() {
                writeln!(out, "  {}", Self::directive(initial, action))?;
            }
        }
        Ok(())
    }

    fn directive(initial: &WorldState, action: &Action) -> String {
        let kind = action
            .resource()
            .and_then(|r| initial.resources().resource(r))
            .map(|r| r.kind());
        match (*action, kind) {
            (Action::Gather { unit, resource }, Some(ResourceKind::Wood)) => {
                format!("{} chops wood from {}.", unit, resource)
            }
            (Action::Gather { unit, resource }, _) => {
                format!("{} mines gold from {}.", unit, resource)
            }
            (Action::Deposit { unit, .. }, Some(kind)) => format!("{} deposits {}.", unit, kind),
            (Action::Deposit { unit, .. }, None) => format!("{} deposits its load.", unit),
            (Action::Produce { producer, .. }, _) => {
                format!("{} produces one worker.", producer)
            }
            (Action::Idle { unit }, _) => format!("{} waits.", unit),
        }
    }

    fn state_label(state: &WorldState) -> String {
        let resources = state.resources();
        let mut lines = vec![
            format!("gold: {}", resources.stockpile(ResourceKind::Gold)),
            format!("wood: {}", resources.stockpile(ResourceKind::Wood)),
            format!("workers: {}", state.units().worker_count()),
        ];
        lines.extend(
            resources
                .resources()
                .map(|(r, remaining)| format!("{} ({}): {}", r.id(), r.kind(), remaining)),
        );
        lines.join("\\n")
    }
}
