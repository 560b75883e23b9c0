use thiserror::Error;

/// Conditions under which a kernel or the solver refuses to run.
///
/// These are fatal for a simulation: continuing would silently corrupt the
/// force or potential fields. The binary logs them and exits; library callers
/// get them back as ordinary `Result` values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreconditionError {
    #[error("halo depth {actual} is below the {required} required by the stencil")]
    InsufficientHalo { required: usize, actual: usize },

    #[error("local extent {extent} in dimension {dim} must be even for red/black ordering")]
    OddExtent { dim: usize, extent: usize },

    #[error("extent {extent} in dimension {dim} is smaller than the halo depth {nhalo}")]
    ExtentBelowHalo { dim: usize, extent: usize, nhalo: usize },

    #[error("the full velocity set stencil cannot be used with {planes} sliding planes")]
    SlidingPlanes { planes: usize },

    #[error("order parameter has {nf} components; at most {max} are supported")]
    TooManyComponents { nf: usize, max: usize },

    #[error("force method {method} needs a {capability} provider")]
    MissingCapability {
        method: &'static str,
        capability: &'static str,
    },

    #[error("force method {method} needs {input}")]
    MissingInput {
        method: &'static str,
        input: &'static str,
    },

    #[error("relaxation parameter {omega} left the open interval (1, 2)")]
    RelaxationOutOfRange { omega: f64 },

    #[error("{what} holds {actual} sites but the lattice has {expected}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_insufficient_halo() {
        let err = PreconditionError::InsufficientHalo {
            required: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "halo depth 1 is below the 2 required by the stencil"
        );
    }

    #[test]
    fn display_relaxation_names_omega() {
        let err = PreconditionError::RelaxationOutOfRange { omega: 2.5 };
        assert!(err.to_string().contains("2.5"));
    }

    #[test]
    fn error_trait_works() {
        let err = PreconditionError::SlidingPlanes { planes: 2 };
        let dyn_err: &dyn std::error::Error = &err;
        assert!(dyn_err.to_string().contains("sliding planes"));
    }
}
