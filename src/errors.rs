use thiserror::Error;

#[derive(Debug, Error)]
pub enum PvError {
    #[error("Input '{name}' has {found} values but {expected} timestamps were given")]
    InputLengthMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Engine must be fitted with timeseries inputs before running timesteps")]
    NotFitted,
    #[error("Timestep index {index} is out of range for {n_timesteps} fitted timesteps")]
    TimestepOutOfRange { index: usize, n_timesteps: usize },
    #[error("PV array parameters are invalid: {0}")]
    InvalidParameters(String),
    #[error("PV array geometry is physically invalid: {0}")]
    InvalidGeometry(String),
    #[error("Surface {index} has reflectivity {value}, which must be in the range [0, 1)")]
    InvalidReflectivity { index: usize, value: f64 },
    #[error("View factors leaving surface {index} sum to {sum}, which exceeds 1")]
    ViewFactorConservation { index: usize, sum: f64 },
    #[error("Radiosity system could not be solved as its matrix is singular")]
    SingularRadiositySystem,
    #[error("Parameter '{0}' was not found on all surfaces")]
    ParameterNotFound(String),
    #[error("Cannot calculate an area-weighted value over a total area of zero")]
    ZeroArea,
}
