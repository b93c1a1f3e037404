//! Shared utilities for use cases.
//!
//! Contains cancellation and deadline checks used by the agent loop and the
//! phase controller.

use crate::use_cases::agent_loop::RunInterrupted;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested or the deadline has passed.
pub(crate) fn check_cancelled(
    token: &Option<CancellationToken>,
    deadline: Option<Instant>,
) -> Result<(), RunInterrupted> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(RunInterrupted::Cancelled);
    }
    if let Some(deadline) = deadline
        && Instant::now() >= deadline
    {
        return Err(RunInterrupted::DeadlineReached);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_check_cancelled() {
        assert!(check_cancelled(&None, None).is_ok());

        let token = CancellationToken::new();
        assert!(check_cancelled(&Some(token.clone()), None).is_ok());
        token.cancel();
        assert_eq!(
            check_cancelled(&Some(token), None),
            Err(RunInterrupted::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let deadline = Instant::now() + Duration::from_secs(1);
        assert!(check_cancelled(&None, Some(deadline)).is_ok());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(
            check_cancelled(&None, Some(deadline)),
            Err(RunInterrupted::DeadlineReached)
        );
    }
}
