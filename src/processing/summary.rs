use crate::config::RunConfig;
use crate::numerics::sor::{SorOutcome, SorResult};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// One SOR run as it appears in the summary.
#[derive(Debug, Clone)]
pub struct SolveRecord {
    pub label: String,
    pub result: SorResult,
    /// Largest deviation from the exact profile, when one was computed.
    pub max_error: Option<f64>,
}

pub struct SimulationSummary {
    pub ntotal: [usize; 3],
    pub nhalo: usize,
    pub epsilon: f64,
    pub beta: f64,
    pub unit_charge: f64,
    pub abstol: f64,
    pub reltol: f64,
    pub net_charge: f64,
    pub solves: Vec<SolveRecord>,
    pub max_solver_diff: Option<f64>,
}

impl SimulationSummary {
    pub fn from_config(config: &RunConfig, net_charge: f64) -> Self {
        Self {
            ntotal: config.ntotal,
            nhalo: config.nhalo,
            epsilon: config.electrostatics.epsilon,
            beta: config.electrostatics.beta,
            unit_charge: config.electrostatics.unit_charge,
            abstol: config.solver.abstol,
            reltol: config.solver.reltol,
            net_charge,
            solves: Vec::new(),
            max_solver_diff: None,
        }
    }

    pub fn add_solve(&mut self, label: &str, result: SorResult, max_error: Option<f64>) {
        self.solves.push(SolveRecord {
            label: label.to_string(),
            result,
            max_error,
        });
    }

    /// Largest pointwise difference between two profiles after removing
    /// their values at the first plane.
    pub fn add_comparison(&mut self, a: &[f64], b: &[f64]) {
        self.max_solver_diff = Some(max_shifted_diff(a, b));
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out, "CHARGED SLAB POISSON SUMMARY")?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out)?;

        writeln!(out, "LATTICE")?;
        writeln!(out, "{}", "-".repeat(60))?;
        writeln!(
            out,
            "System size:         {} x {} x {}",
            self.ntotal[0], self.ntotal[1], self.ntotal[2]
        )?;
        writeln!(out, "Halo depth:          {}", self.nhalo)?;
        writeln!(out)?;

        writeln!(out, "ELECTROSTATICS")?;
        writeln!(out, "{}", "-".repeat(60))?;
        writeln!(out, "Permittivity:        {:.6e}", self.epsilon)?;
        writeln!(out, "Beta:                {:.6e}", self.beta)?;
        writeln!(out, "Unit charge:         {:.6e}", self.unit_charge)?;
        writeln!(out, "Net charge:          {:.6e}", self.net_charge)?;
        writeln!(out, "Absolute tolerance:  {:.6e}", self.abstol)?;
        writeln!(out, "Relative tolerance:  {:.6e}", self.reltol)?;
        writeln!(out)?;

        if !self.solves.is_empty() {
            writeln!(out, "SOLVER PERFORMANCE")?;
            writeln!(out, "{}", "-".repeat(60))?;
            for solve in &self.solves {
                let r = &solve.result;
                writeln!(out, "{}:", solve.label)?;
                writeln!(out, "  Outcome:           {}", outcome_label(r.outcome))?;
                writeln!(out, "  Iterations:        {}", r.iterations)?;
                writeln!(out, "  Initial residual:  {:.6e}", r.initial_residual)?;
                writeln!(out, "  Final residual:    {:.6e}", r.final_residual)?;
                writeln!(out, "  Final omega:       {:.6}", r.omega)?;
                if let Some(err) = solve.max_error {
                    writeln!(out, "  Max error (exact): {:.6e}", err)?;
                }
            }
            writeln!(out)?;
        }

        if let Some(diff) = self.max_solver_diff {
            writeln!(out, "SOLVER COMPARISON")?;
            writeln!(out, "{}", "-".repeat(60))?;
            writeln!(out, "Max difference:      {:.6e}", diff)?;
            writeln!(out)?;
        }

        writeln!(out, "{}", "=".repeat(60))?;
        Ok(())
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        self.write_to(&mut file)
    }

    pub fn log_summary(&self) {
        log::info!("{}", "=".repeat(60));
        log::info!("SIMULATION SUMMARY");
        log::info!(
            "Lattice:       {} x {} x {}, net charge {:.3e}",
            self.ntotal[0],
            self.ntotal[1],
            self.ntotal[2],
            self.net_charge
        );
        for solve in &self.solves {
            log::info!(
                "{:<14} {} after {} iterations",
                format!("{}:", solve.label),
                outcome_label(solve.result.outcome),
                solve.result.iterations
            );
        }
        if let Some(diff) = self.max_solver_diff {
            log::info!("Max diff:      {:.3e}", diff);
        }
        log::info!("{}", "=".repeat(60));
    }
}

fn outcome_label(outcome: SorOutcome) -> &'static str {
    match outcome {
        SorOutcome::ConvergedAbsolute => "converged (absolute)",
        SorOutcome::ConvergedRelative => "converged (relative)",
        SorOutcome::MaxIterations => "NOT converged",
    }
}

/// Potentials are defined up to a constant; compare them relative to plane 1.
pub fn max_shifted_diff(a: &[f64], b: &[f64]) -> f64 {
    let (Some(a0), Some(b0)) = (a.first(), b.first()) else {
        return 0.0;
    };
    a.iter()
        .zip(b)
        .map(|(x, y)| ((x - a0) - (y - b0)).abs())
        .fold(0.0, f64::max)
}
