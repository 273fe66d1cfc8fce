use thiserror::Error;

/// Unified result type for the navigation controller.
pub type Result<T> = std::result::Result<T, NavigationError>;

/// Errors surfaced by the navigation controller and its collaborators.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("a host container is already attached; detach it first")]
    AlreadyAttached,
    #[error("host container did not provide its {0}")]
    IncompleteHost(&'static str),
    #[error("navigation stack is empty")]
    EmptyStack,
    #[error("screen `{0}` needs a restart before it can be resumed")]
    RestartPending(String),
    #[error("no host container is attached")]
    NotAttached,
    #[error("navigation controller has been dropped")]
    ControllerGone,
    #[error("screen error: {0}")]
    Screen(String),
    #[error("transition error: {0}")]
    Transition(String),
    #[error("host error: {0}")]
    Host(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NavigationError {
    pub fn screen(message: impl Into<String>) -> Self {
        Self::Screen(message.into())
    }

    /// True for errors that signal a broken host/controller integration rather
    /// than a failure reported by a collaborator.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::AlreadyAttached
                | Self::IncompleteHost(_)
                | Self::EmptyStack
                | Self::RestartPending(_)
                | Self::NotAttached
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_violations_are_classified() {
        assert!(NavigationError::AlreadyAttached.is_invariant_violation());
        assert!(NavigationError::EmptyStack.is_invariant_violation());
        assert!(!NavigationError::screen("boom").is_invariant_violation());
        assert!(!NavigationError::ControllerGone.is_invariant_violation());
    }

    #[test]
    fn messages_name_the_missing_part() {
        let err = NavigationError::IncompleteHost("layout inflater");
        assert_eq!(
            err.to_string(),
            "host container did not provide its layout inflater"
        );
    }
}
