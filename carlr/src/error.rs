use anyhow::Error;
use carlog::prelude::CarlogError;

/// 2 when the backend can't be reached or the input file is unusable, 1 otherwise.
pub fn exit_code(err: &Error) -> i32 {
    if matches!(
        err.downcast_ref::<CarlogError>(),
        Some(
            CarlogError::BackendUnavailable { .. }
                | CarlogError::ProbeCancelled
                | CarlogError::Http { .. }
                | CarlogError::TooManyRetries { .. }
                | CarlogError::CorruptBackup { .. }
                | CarlogError::InvalidBackup { .. }
        )
    ) {
        return 2;
    }
    1
}
