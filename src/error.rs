use crate::config::MonitorType;

/// Errors caused by the caller rather than by the health of a target.
///
/// A target being down is never an error, it is an
/// [`ExecutorResult`](crate::ExecutorResult) with status `DOWN`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown monitor type: {0}")]
    UnknownMonitorType(String),

    #[error("configuration for {actual} passed to the {expected} executor")]
    ConfigMismatch {
        expected: MonitorType,
        actual: MonitorType,
    },
}
