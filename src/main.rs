use lbfs_rs::config::RunConfig;
use lbfs_rs::discretization::lattice::SerialLattice;
use lbfs_rs::models::charged_slab::{
    ChargedSlab, charge_profile, exact_potential, potential_profile,
};
use lbfs_rs::numerics::sor::{SorResult, SorSolver};
use lbfs_rs::physics::functional::FunctionalPermittivity;
use lbfs_rs::processing::csv_writer::CsvTable;
use lbfs_rs::processing::summary::{SimulationSummary, max_shifted_diff};
use std::error::Error;
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Reading configuration from {}", path);
            RunConfig::from_file(path)?
        }
        None => RunConfig::default(),
    };
    fs::create_dir_all(&config.output_dir)?;

    let lattice = SerialLattice::new(config.ntotal, config.nhalo)?;
    let slab = ChargedSlab {
        electrostatics: config.electrostatics,
        solver: config.solver,
        ..ChargedSlab::default()
    };
    let solver = SorSolver::new(config.backend);

    let mut uniform = slab.potential(&lattice, config.logging);
    let mut summary = SimulationSummary::from_config(&config, uniform.total_charge(&lattice));

    let exact = exact_potential(&lattice, &uniform).map(|psi| psi.as_slice().to_vec());
    if exact.is_none() {
        log::warn!("Exact reference profile is singular; skipping comparison");
    }

    log::info!("Running uniform permittivity SOR...");
    let result = solver.solve_uniform(&lattice, &mut uniform, Some(0))?;
    let psi_uniform = potential_profile(&lattice, &uniform);
    record(&mut summary, "Uniform", result, &psi_uniform, exact.as_deref());

    log::info!("Running variable permittivity SOR...");
    let mut variable = slab.potential(&lattice, false);
    let permittivity = FunctionalPermittivity::constant(config.electrostatics.epsilon);
    let result = solver.solve_variable(&lattice, &mut variable, &permittivity, Some(0))?;
    let psi_variable = potential_profile(&lattice, &variable);
    record(&mut summary, "Variable", result, &psi_variable, exact.as_deref());

    summary.add_comparison(&psi_uniform, &psi_variable);

    save_profiles(
        &config,
        &psi_uniform,
        &psi_variable,
        exact.as_deref(),
        &charge_profile(&lattice, &uniform),
    )?;

    let summary_path = config.output_dir.join("simulation_summary.txt");
    summary.write_to_file(&summary_path)?;
    summary.log_summary();
    log::info!("Summary saved to {}", summary_path.display());

    Ok(())
}

fn record(
    summary: &mut SimulationSummary,
    label: &str,
    result: SorResult,
    profile: &[f64],
    exact: Option<&[f64]>,
) {
    let max_error = exact.map(|exact| max_shifted_diff(profile, exact));
    if let Some(err) = max_error {
        log::info!("{} solver: max deviation from exact profile {:.3e}", label, err);
    }
    summary.add_solve(label, result, max_error);
}

fn save_profiles(
    config: &RunConfig,
    psi_uniform: &[f64],
    psi_variable: &[f64],
    exact: Option<&[f64]>,
    rho_elec: &[f64],
) -> Result<(), Box<dyn Error>> {
    let z: Vec<f64> = (1..=psi_uniform.len()).map(|k| k as f64).collect();
    let shift = |profile: &[f64]| -> Vec<f64> {
        let p0 = profile.first().copied().unwrap_or(0.0);
        profile.iter().map(|p| p - p0).collect()
    };
    let psi_uniform = shift(psi_uniform);
    let psi_variable = shift(psi_variable);
    let psi_exact = exact.map(|e| shift(e)).unwrap_or_else(|| vec![f64::NAN; z.len()]);

    let path = config.output_dir.join("profile.csv");
    CsvTable::new()
        .column("z", &z)
        .column("psi_uniform", &psi_uniform)
        .column("psi_variable", &psi_variable)
        .column("psi_exact", &psi_exact)
        .column("rho_elec", rho_elec)
        .write(&path)?;

    log::info!("Profiles saved to {}", path.display());
    Ok(())
}
