pub mod config;
pub mod outcome;
pub mod types;

pub use config::{Config, ConfigError};
pub use outcome::{Compensation, SagaOutcome, SagaStep, StepFailure};
pub use types::*;
