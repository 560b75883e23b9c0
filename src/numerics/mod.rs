pub mod parallel;
pub mod sor;
pub mod timing;

/// Which stopping test an iterative solve satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converged {
    Absolute,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    Absolute(f64),
    Relative(f64),
    Combined(f64, f64),
}

impl Tolerance {
    /// Classify `norm` against the tolerance. The absolute test is tried
    /// first; the relative one is measured against `initial_norm`.
    pub fn check(&self, norm: f64, initial_norm: f64) -> Option<Converged> {
        match *self {
            Tolerance::Absolute(tol) => (norm < tol).then_some(Converged::Absolute),
            Tolerance::Relative(tol) => (norm / initial_norm < tol).then_some(Converged::Relative),
            Tolerance::Combined(abs_tol, rel_tol) => {
                if norm < abs_tol {
                    Some(Converged::Absolute)
                } else if norm / initial_norm < rel_tol {
                    Some(Converged::Relative)
                } else {
                    None
                }
            }
        }
    }
}
