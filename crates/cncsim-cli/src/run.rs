//! The parse, simulate, write and carve pipeline.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cncsim_gcode::{parse_file, write_path};
use cncsim_machine::{SimReport, Simulator};
use cncsim_stock::{CarveStats, Stock, StockReport};
use log::info;
use serde::Serialize;

use crate::config::JobConfig;

/// Stock results of a run.
#[derive(Debug, Clone, Serialize)]
pub struct StockSummary {
    /// Placement counts from carving.
    pub carve: CarveStats,
    /// Final stock state.
    pub report: StockReport,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Program file.
    pub input: PathBuf,
    /// Commands in the parsed program.
    pub commands: usize,
    /// Simulation results.
    pub sim: SimReport,
    /// Path file, if one was written.
    pub path_file: Option<PathBuf>,
    /// Stock results, if carving was enabled.
    pub stock: Option<StockSummary>,
}

/// Parse and simulate `input`, then write the path and carve the stock.
///
/// Any parse error stops the run before simulation starts.
pub fn run(input: &Path, job: &JobConfig) -> Result<Summary> {
    let program = parse_file(input, &job.parse)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    info!("parsed {} commands from {}", program.len(), input.display());

    let mut sim = Simulator::new(job.sim.clone()).context("invalid simulation settings")?;
    let report = sim
        .run(&program)
        .with_context(|| format!("simulation of {} failed", input.display()))?;

    let path_file = if job.output.write_path {
        let out = &job.output.path;
        let file = File::create(out).with_context(|| format!("failed to create {}", out.display()))?;
        write_path(sim.path(), BufWriter::new(file))
            .with_context(|| format!("failed to write {}", out.display()))?;
        info!("wrote {} path points to {}", sim.path().len(), out.display());
        Some(out.clone())
    } else {
        None
    };

    let stock = if job.stock.enabled {
        let mut stock =
            Stock::new(job.stock.clone(), &job.tools).context("invalid stock settings")?;
        let changes: Vec<(usize, u32)> = report
            .tool_changes
            .iter()
            .map(|c| (c.path_index, c.tool))
            .collect();
        let carve = stock
            .machine_path(sim.path(), &changes)
            .context("carving the stock failed")?;
        let report = stock.report().context("stock report failed")?;
        Some(StockSummary { carve, report })
    } else {
        None
    };

    Ok(Summary {
        input: input.to_path_buf(),
        commands: program.len(),
        sim: report,
        path_file,
        stock,
    })
}

/// Human-readable summary.
pub fn print_summary(summary: &Summary) {
    let sim = &summary.sim;
    println!("Program:     {}", summary.input.display());
    println!("Commands:    {} ({} moves)", summary.commands, sim.moves);
    println!("Path points: {}", sim.path_points);
    let [x, y, z] = sim.final_position;
    println!("Final:       X{x} Y{y} Z{z}");
    if sim.program_ended {
        println!("Stopped at program end");
    }
    for change in &sim.tool_changes {
        println!(
            "Tool change: T{} at line {} (point {})",
            change.tool, change.line, change.path_index
        );
    }
    if let Some(path) = &summary.path_file {
        println!("Path file:   {}", path.display());
    }
    if let Some(stock) = &summary.stock {
        let r = &stock.report;
        println!(
            "Stock:       {:.3} mm³ of {:.3} mm³ left ({:.3} removed, {} triangles)",
            r.volume, r.initial_volume, r.removed_volume, r.triangles
        );
        println!(
            "Carving:     {} cuts, {} in air, {} skipped",
            stock.carve.cuts, stock.carve.air, stock.carve.skipped
        );
        if let Some(v) = r.voxels {
            println!(
                "Voxels:      {} inside, {} boundary, {} outside",
                v.inside, v.boundary, v.outside
            );
        }
    }
}
