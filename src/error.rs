//! Error types shared by every layer of the engine.
//!
//! Two families exist. [`InputError`]s are caused by the user (a bad name, a
//! wrong component count, ...) and are recoverable at the scripting boundary:
//! the offending command fails and the session continues. [`InvariantViolation`]s
//! indicate a module-wiring defect and should abort the run.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("undefined quantity: '{name}'")]
    UnknownQuantity { name: String },
    #[error("unknown module: '{name}'")]
    UnknownModule { name: String },
    #[error("'{name}' has {expected} component(s), but {actual} provided")]
    ComponentMismatch { name: String, expected: usize, actual: usize },
    #[error("'{name}' is of kind {actual}, expected one of: {expected}")]
    KindMismatch { name: String, expected: String, actual: String },
    #[error("'{name}' is not a scalar, it has {ncomp} components")]
    NotScalar { name: String, ncomp: usize },
    #[error("{what} already set")]
    GeometryAlreadySet { what: &'static str },
    #[error("{what} should be set first")]
    GeometryNotSet { what: &'static str },
    #[error("time samples of '{name}' should be in chronological order, but {previous} > {time}")]
    OutOfOrderSample { name: String, previous: f64, time: f64 },
    #[error("time-dependent '{name}' needs at least two samples, has {count}")]
    TooFewSamples { name: String, count: usize },
    #[error("no such handle: {handle}")]
    UnknownHandle { handle: usize },
    #[error("multiplier of '{name}' should be uniform, got {values:?}")]
    NonUniformMultiplier { name: String, values: Vec<f64> },
    #[error("'{name}' was read before it was ever set")]
    Unassigned { name: String },
    #[error("'{name}' is not an ordinary array but has a multiplier {multiplier:?}; set the mask or the multiplier instead")]
    ScaledField { name: String, multiplier: Vec<f64> },
    #[error("can not make '{name}' time-dependent, it is already determined by a '{updater}' updater")]
    AlreadyDetermined { name: String, updater: String },
    #[error("'{name}' expects an array of size {expected:?}, got {actual:?}")]
    ShapeMismatch { name: String, expected: [usize; 3], actual: [usize; 3] },
    #[error("cell {cell:?} out of range for '{name}' with grid {grid:?}")]
    CellOutOfRange { name: String, cell: [usize; 3], grid: [usize; 3] },
    #[error("time step must be positive, got {dt}")]
    NonPositiveStep { dt: f64 },
    #[error("no solver has been configured")]
    NoSolver,
    #[error("unsupported output format: '{format}'")]
    UnsupportedFormat { format: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("i/o error: {0}")]
    Io(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("quantity already defined: '{name}'")]
    DuplicateQuantity { name: String },
    #[error("dependency {child} <- {parent} already present")]
    DuplicateDependency { child: String, parent: String },
    #[error("module already registered: '{name}'")]
    DuplicateModule { name: String },
    #[error("'{name}' is not a sum, nothing can be added to it")]
    NotASum { name: String },
    #[error("dependency cycle detected at '{name}'")]
    CycleDetected { name: String },
    #[error("solver step requested while a step is in progress")]
    SolverBusy,
}

/// A periodic action that could not be carried out after a step.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("handle {handle}: {error}")]
pub struct ActionFailure {
    pub handle: usize,
    pub error: Box<EngineError>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("BUG: {0}")]
    Invariant(#[from] InvariantViolation),
    /// The step itself completed and was kept; only some periodic actions failed.
    #[error("step {step} completed, but periodic actions failed: {}", join_failures(.failures))]
    Actions { step: u64, failures: Vec<ActionFailure> },
}

fn join_failures(failures: &[ActionFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl EngineError {
    /// Invariant violations are not expected to be recovered from.
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::Input(_) => false,
            EngineError::Invariant(_) => true,
            EngineError::Actions { failures, .. } => failures.iter().any(|f| f.error.is_fatal()),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Input(InputError::Io(e.to_string()))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Input(InputError::Config(e.to_string()))
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_follows_family() {
        let input: EngineError = InputError::NoSolver.into();
        let bug: EngineError = InvariantViolation::SolverBusy.into();
        assert!(!input.is_fatal());
        assert!(bug.is_fatal());
    }

    #[test]
    fn test_messages_name_the_quantity() {
        let e: EngineError = InputError::NotScalar { name: "m".into(), ncomp: 3 }.into();
        assert!(e.to_string().contains("'m'"));
        let e: EngineError = InvariantViolation::DuplicateQuantity { name: "H".into() }.into();
        assert_eq!(e.to_string(), "BUG: quantity already defined: 'H'");
    }

    #[test]
    fn test_action_failures_keep_their_cause() {
        let failure = |handle, error: EngineError| ActionFailure { handle, error: Box::new(error) };
        let e = EngineError::Actions {
            step: 4,
            failures: vec![failure(0, InputError::UnsupportedFormat { format: "ovf".into() }.into())],
        };
        assert!(!e.is_fatal());
        assert_eq!(e.to_string(), "step 4 completed, but periodic actions failed: handle 0: unsupported output format: 'ovf'");

        let e = EngineError::Actions { step: 4, failures: vec![failure(1, InvariantViolation::SolverBusy.into())] };
        assert!(e.is_fatal());
    }
}
