//! Error types for the remold engine.
//!
//! Uses `thiserror` for ergonomic error definitions. Lookups fail with one
//! of the data-absence variants, each tied to the kind of container that was
//! accessed. Resolution control flow (skipping an element) travels next to
//! errors as a [`Halt`], never as a `PortError` itself.

use thiserror::Error;

/// Every failure the engine can surface to a caller.
#[derive(Debug, Error)]
pub enum PortError {
    // --- Data absence ---
    #[error("no field `{field}` on {type_name}")]
    FieldNotFound { type_name: String, field: String },

    #[error("key {key} not found")]
    KeyNotFound { key: String },

    #[error("{kind} index {index} out of range (length {len})")]
    IndexOutOfRange {
        kind: String,
        index: i64,
        len: usize,
    },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    // --- Operations ---
    #[error("invalid string template: {0}")]
    Format(String),

    // --- Engine misuse ---
    #[error("skip signal asked to re-raise without an underlying cause")]
    SkipWithoutCause,

    #[error("deferred result reached a synchronous context")]
    DeferredInSyncContext,

    #[error("resolution exceeded {limit} nested re-entries")]
    ResolutionLimit { limit: usize },

    // --- Host ---
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PortError {
    /// Wrap an arbitrary host failure.
    pub fn other(message: impl std::fmt::Display) -> Self {
        PortError::Other(anyhow::anyhow!("{message}"))
    }

    /// Whether this failure means "the value is not there" rather than a defect.
    ///
    /// Type mismatches count: asking a scalar for a key is absence of the
    /// expected shape.
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            PortError::FieldNotFound { .. }
                | PortError::KeyNotFound { .. }
                | PortError::IndexOutOfRange { .. }
                | PortError::TypeMismatch(_)
        )
    }
}

/// Result type alias using [`PortError`].
pub type Result<T> = std::result::Result<T, PortError>;

/// "Omit this element from its containing structure."
///
/// Optionally carries the failure that caused it. Wrapping a skip in another
/// skip keeps the innermost real cause, so [`SkipSignal::into_cause`] never
/// has to walk a chain.
#[derive(Debug, Default)]
pub struct SkipSignal {
    cause: Option<Box<PortError>>,
}

impl SkipSignal {
    /// A skip with no underlying cause.
    pub fn new() -> Self {
        Self::default()
    }

    /// A skip caused by `error`.
    pub fn because(error: PortError) -> Self {
        Self {
            cause: Some(Box::new(error)),
        }
    }

    /// A new skip wrapping an inner one.
    pub fn wrap(inner: SkipSignal) -> Self {
        inner
    }

    pub fn cause(&self) -> Option<&PortError> {
        self.cause.as_deref()
    }

    /// Convert back into the failure that caused the skip.
    ///
    /// Contexts with no notion of skipping call this. A causeless skip is a
    /// programmer error and surfaces as [`PortError::SkipWithoutCause`].
    pub fn into_cause(self) -> PortError {
        match self.cause {
            Some(cause) => *cause,
            None => PortError::SkipWithoutCause,
        }
    }
}

impl std::fmt::Display for SkipSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "skipped: {cause}"),
            None => f.write_str("skipped"),
        }
    }
}

/// Why an operation stopped without producing a value.
#[derive(Debug)]
pub enum Halt {
    /// Drop the element; only container building understands this.
    Skip(SkipSignal),
    /// A real failure; aborts the whole resolution.
    Fail(PortError),
}

impl Halt {
    pub fn is_skip(&self) -> bool {
        matches!(self, Halt::Skip(_))
    }

    /// Collapse into an error for contexts that do not understand skipping.
    pub fn into_error(self) -> PortError {
        match self {
            Halt::Skip(signal) => signal.into_cause(),
            Halt::Fail(error) => error,
        }
    }
}

impl From<PortError> for Halt {
    fn from(error: PortError) -> Self {
        Halt::Fail(error)
    }
}

impl From<SkipSignal> for Halt {
    fn from(signal: SkipSignal) -> Self {
        Halt::Skip(signal)
    }
}

impl std::fmt::Display for Halt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Halt::Skip(signal) => signal.fmt(f),
            Halt::Fail(error) => error.fmt(f),
        }
    }
}

/// The three-way result of an operation: `Ok(value)`, `Err(Halt::Skip)` or
/// `Err(Halt::Fail)`.
pub type Outcome<T> = std::result::Result<T, Halt>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absence_kinds_are_classified() {
        assert!(
            PortError::KeyNotFound {
                key: "\"j\"".into()
            }
            .is_absence()
        );
        assert!(
            PortError::IndexOutOfRange {
                kind: "list".into(),
                index: 0,
                len: 0
            }
            .is_absence()
        );
        assert!(!PortError::other("disk on fire").is_absence());
        assert!(!PortError::SkipWithoutCause.is_absence());
    }

    #[test]
    fn skip_reraises_innermost_cause() {
        let inner = SkipSignal::because(PortError::KeyNotFound {
            key: "\"absent\"".into(),
        });
        let outer = SkipSignal::wrap(SkipSignal::wrap(inner));
        assert!(matches!(
            outer.into_cause(),
            PortError::KeyNotFound { key } if key == "\"absent\""
        ));
    }

    #[test]
    fn causeless_skip_fails_loudly() {
        let err = Halt::Skip(SkipSignal::new()).into_error();
        assert!(matches!(err, PortError::SkipWithoutCause));
    }

    #[test]
    fn error_messages_name_the_container() {
        let err = PortError::IndexOutOfRange {
            kind: "list".into(),
            index: 3,
            len: 2,
        };
        assert_eq!(err.to_string(), "list index 3 out of range (length 2)");

        let err = PortError::FieldNotFound {
            type_name: "map".into(),
            field: "x".into(),
        };
        assert!(err.to_string().contains("`x`"));
    }
}
