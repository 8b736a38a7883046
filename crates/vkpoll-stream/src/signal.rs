//! Termination and error signals.

/// A signal carried by a pull toward the producer, or returned toward the
/// consumer in place of a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<E> {
    /// Explicit termination. Unwinds every stage it reaches.
    End,
    /// A failure that a stage may suppress and retry.
    Error(E),
}

impl<E> Signal<E> {
    /// Check if this is an explicit end.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Get the carried error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&E> {
        match self {
            Self::Error(err) => Some(err),
            Self::End => None,
        }
    }

    /// Consume the signal, returning the carried error.
    #[must_use]
    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Error(err) => Some(err),
            Self::End => None,
        }
    }
}

impl<E> From<E> for Signal<E> {
    fn from(err: E) -> Self {
        Self::Error(err)
    }
}

/// Answer to a pull: a value, or a signal.
pub type Pulled<T, E> = Result<T, Signal<E>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_has_no_error() {
        let signal: Signal<&str> = Signal::End;
        assert!(signal.is_end());
        assert_eq!(signal.error(), None);
        assert_eq!(signal.into_error(), None);
    }

    #[test]
    fn error_exposes_payload() {
        let signal = Signal::from("boom");
        assert!(!signal.is_end());
        assert_eq!(signal.error(), Some(&"boom"));
        assert_eq!(signal.into_error(), Some("boom"));
    }
}
