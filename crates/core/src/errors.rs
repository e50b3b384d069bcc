use std::time::Duration;

/// Result type alias for objacl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`] used by callers that branch on the
/// failure rather than render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    CycleDetected,
    HasChildren,
    InvalidOrder,
    StoreUnavailable,
    Timeout,
    AccessDenied,
    InvalidPermission,
    InvalidCaller,
    InvalidInput,
    Configuration,
}

/// Core error type for objacl operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No ACL exists for the object identity
    #[error("no ACL found for '{object_identity}'")]
    NotFound { object_identity: String },

    /// An ACL already exists for the object identity
    #[error("an ACL already exists for '{object_identity}'")]
    AlreadyExists { object_identity: String },

    /// Following parent links would revisit an identity
    #[error("parent chain of '{object_identity}' forms a cycle: {}", .chain.join(" -> "))]
    CycleDetected {
        object_identity: String,
        chain: Vec<String>,
    },

    /// Delete without cascade on an ACL that still has children
    #[error("ACL for '{object_identity}' has {children} child ACL(s)")]
    HasChildren {
        object_identity: String,
        children: usize,
    },

    /// ACE index outside the entry list
    #[error("ACE index {index} out of range for ACL with {len} entries")]
    InvalidOrder { index: usize, len: usize },

    /// Backing store failure
    #[error("ACL store {operation} failed: {message}")]
    StoreUnavailable {
        operation: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Store call exceeded its deadline
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The caller may not change the ACL
    #[error("'{principal}' may not perform {operation} on '{object_identity}'")]
    AccessDenied {
        principal: String,
        operation: String,
        object_identity: String,
    },

    /// Unknown permission name or unusable mask
    #[error("invalid permission '{permission}': {message}")]
    InvalidPermission { permission: String, message: String },

    /// Caller without a usable principal
    #[error("invalid caller: {message}")]
    InvalidCaller { message: String },

    /// Malformed input other than permissions and callers
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Configuration {
            message: format!("invalid JSON: {error}"),
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a not-found error for an object identity
    #[must_use]
    pub fn not_found(object_identity: impl ToString) -> Self {
        Error::NotFound {
            object_identity: object_identity.to_string(),
        }
    }

    /// Create an already-exists error for an object identity
    #[must_use]
    pub fn already_exists(object_identity: impl ToString) -> Self {
        Error::AlreadyExists {
            object_identity: object_identity.to_string(),
        }
    }

    /// Create a cycle error carrying the offending chain
    #[must_use]
    pub fn cycle_detected(object_identity: impl ToString, chain: Vec<String>) -> Self {
        Error::CycleDetected {
            object_identity: object_identity.to_string(),
            chain,
        }
    }

    /// Create a has-children error
    #[must_use]
    pub fn has_children(object_identity: impl ToString, children: usize) -> Self {
        Error::HasChildren {
            object_identity: object_identity.to_string(),
            children,
        }
    }

    /// Create an out-of-range ACE index error
    #[must_use]
    pub fn invalid_order(index: usize, len: usize) -> Self {
        Error::InvalidOrder { index, len }
    }

    /// Create a store error without an underlying source
    #[must_use]
    pub fn store_unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::StoreUnavailable {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error wrapping the driver error
    #[must_use]
    pub fn store_unavailable_with_source(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let source = source.into();
        Error::StoreUnavailable {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an access denied error for an ACL mutation
    #[must_use]
    pub fn access_denied(
        principal: impl Into<String>,
        operation: impl Into<String>,
        object_identity: impl ToString,
    ) -> Self {
        Error::AccessDenied {
            principal: principal.into(),
            operation: operation.into(),
            object_identity: object_identity.to_string(),
        }
    }

    /// Create an invalid permission error
    #[must_use]
    pub fn invalid_permission(permission: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidPermission {
            permission: permission.into(),
            message: message.into(),
        }
    }

    /// Create an invalid caller error
    #[must_use]
    pub fn invalid_caller(message: impl Into<String>) -> Self {
        Error::InvalidCaller {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::CycleDetected { .. } => ErrorKind::CycleDetected,
            Self::HasChildren { .. } => ErrorKind::HasChildren,
            Self::InvalidOrder { .. } => ErrorKind::InvalidOrder,
            Self::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::InvalidPermission { .. } => ErrorKind::InvalidPermission,
            Self::InvalidCaller { .. } => ErrorKind::InvalidCaller,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// Errors that the decision path converts into a deny instead of
    /// surfacing them to the caller.
    #[must_use]
    pub const fn fails_closed(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::StoreUnavailable
                | ErrorKind::Timeout
                | ErrorKind::CycleDetected
        )
    }
}

// Extension trait for adding store context to Results
pub trait ResultExt<T> {
    /// Map any error into [`Error::StoreUnavailable`] for `operation`
    fn store_context(self, operation: &str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn store_context(self, operation: &str) -> Result<T> {
        self.map_err(|e| Error::store_unavailable_with_source(operation, e))
    }
}
