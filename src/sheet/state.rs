//! Initialization lifecycle of the spreadsheet client.
//!
//! `Uninitialized → Initializing → Ready | Failed`, with `Failed →
//! Initializing` for another attempt. Every transition goes through
//! [`Lifecycle::transition_to`]; waiters observe the state through a watch
//! channel.

use std::fmt;

use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

impl ClientState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientState::Uninitialized => "uninitialized",
            ClientState::Initializing => "initializing",
            ClientState::Ready => "ready",
            ClientState::Failed(_) => "failed",
        }
    }

    fn is_settled(&self) -> bool {
        matches!(self, ClientState::Ready | ClientState::Failed(_))
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Failed(reason) => write!(f, "failed: {}", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: ClientState,
    pub to: ClientState,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid client state transition: {} -> {}",
            self.from.as_str(),
            self.to.as_str()
        )
    }
}

impl std::error::Error for TransitionError {}

#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<ClientState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ClientState::Uninitialized);
        Self { tx }
    }

    pub fn state(&self) -> ClientState {
        self.tx.borrow().clone()
    }

    pub fn transition_to(&self, target: ClientState) -> Result<(), TransitionError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|current| {
            if !is_allowed(current, &target) {
                result = Err(TransitionError {
                    from: current.clone(),
                    to: target.clone(),
                });
                return false;
            }
            tracing::debug!(from = current.as_str(), to = target.as_str(), "client state change");
            *current = target.clone();
            true
        });
        result
    }

    /// Waits until initialization has settled and returns the settled state.
    ///
    /// Returns immediately when nothing has started initializing.
    pub async fn settled(&self) -> ClientState {
        let mut rx = self.tx.subscribe();
        let current = rx.borrow_and_update().clone();
        if current.is_settled() || current == ClientState::Uninitialized {
            return current;
        }
        let settled = match rx.wait_for(ClientState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }
}

fn is_allowed(from: &ClientState, to: &ClientState) -> bool {
    matches!(
        (from, to),
        (ClientState::Uninitialized, ClientState::Initializing)
            | (ClientState::Initializing, ClientState::Ready)
            | (ClientState::Initializing, ClientState::Failed(_))
            | (ClientState::Failed(_), ClientState::Initializing)
    )
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_initial_state() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), ClientState::Uninitialized);
    }

    #[test]
    fn test_valid_transitions() {
        let lifecycle = Lifecycle::new();

        lifecycle.transition_to(ClientState::Initializing).unwrap();
        lifecycle
            .transition_to(ClientState::Failed("no network".to_string()))
            .unwrap();
        lifecycle.transition_to(ClientState::Initializing).unwrap();
        lifecycle.transition_to(ClientState::Ready).unwrap();

        assert_eq!(lifecycle.state(), ClientState::Ready);
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let lifecycle = Lifecycle::new();

        let err = lifecycle.transition_to(ClientState::Ready).unwrap_err();
        assert_eq!(err.from, ClientState::Uninitialized);
        assert_eq!(lifecycle.state(), ClientState::Uninitialized);

        lifecycle.transition_to(ClientState::Initializing).unwrap();
        lifecycle.transition_to(ClientState::Ready).unwrap();
        assert!(lifecycle.transition_to(ClientState::Initializing).is_err());
        assert_eq!(lifecycle.state(), ClientState::Ready);
    }

    #[tokio::test]
    async fn test_settled_returns_immediately_when_uninitialized() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.settled().await, ClientState::Uninitialized);
    }

    #[tokio::test]
    async fn test_settled_waits_for_ready() {
        let lifecycle = Arc::new(Lifecycle::new());
        lifecycle.transition_to(ClientState::Initializing).unwrap();

        let waiter = {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move { lifecycle.settled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        lifecycle.transition_to(ClientState::Ready).unwrap();

        assert_eq!(waiter.await.unwrap(), ClientState::Ready);
    }
}
