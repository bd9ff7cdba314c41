use std::borrow::Cow;

/// All possible error kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Commands could not be dispatched to a device.
    Dispatch,
    /// A service does not exist in the registry.
    UnknownService,
    /// A characteristic does not exist on a service.
    UnknownCharacteristic,
    /// A characteristic cannot be written.
    ReadOnly,
    /// A value lies outside the domain of a characteristic.
    InvalidValue,
    /// Live updates could not be started.
    Updates,
}

impl ErrorKind {
    pub(crate) const fn description(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::UnknownService => "Unknown Service",
            Self::UnknownCharacteristic => "Unknown Characteristic",
            Self::ReadOnly => "Read Only",
            Self::InvalidValue => "Invalid Value",
            Self::Updates => "Updates",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.description().fmt(f)
    }
}

/// A bridge error.
#[derive(Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    description: Cow<'static, str>,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error().fmt(f)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error().fmt(f)
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Creates an [`Error`] from an [`ErrorKind`] and a description.
    #[must_use]
    #[inline]
    pub fn new(kind: ErrorKind, description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    /// Creates a dispatch [`Error`].
    ///
    /// Device implementations return it when commands cannot be delivered.
    #[must_use]
    #[inline]
    pub fn dispatch(description: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Dispatch, description)
    }

    /// Returns the [`ErrorKind`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error description.
    #[must_use]
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> String {
        format!("{}: {}", self.kind, self.description)
    }
}

/// A specialized [`Result`] type for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
