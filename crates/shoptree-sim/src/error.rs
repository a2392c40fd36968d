/// Errors from session simulation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// Returned when a probability parameter lies outside `[0.0, 1.0]`.
    #[error("{parameter} must be a probability in [0.0, 1.0], got {value}")]
    InvalidProbability {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// The value provided.
        value: f64,
    },

    /// Returned when the page-value rate is not a positive finite number.
    #[error("page_value_rate must be positive and finite, got {rate}")]
    InvalidPageValueRate {
        /// The rate provided.
        rate: f64,
    },
}
