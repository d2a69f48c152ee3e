use std::fmt::{self, Display, Formatter};

/// Status of a failed operation at a host boundary.
///
/// Success is expressed as `Ok(_)`; every variant here maps to one of the
/// status codes a host shell can turn into a process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PetError {
    /// A null or out-of-range input reached a public entry point.
    InvalidArgument,
    /// Generic unrecoverable failure, usually an I/O error reported by the host.
    Fail,
    /// An optional host capability is not wired up. Callers skip the feature.
    NotImplemented,
    OutOfMemory,
}

impl PetError {
    pub const SUCCESS_CODE: u32 = 0;

    pub fn code(self) -> u32 {
        match self {
            Self::Fail => 0xC000_0001,
            Self::InvalidArgument => 0xC000_0002,
            Self::NotImplemented => 0xC000_0003,
            Self::OutOfMemory => 0xC000_0004,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0xC000_0001 => Some(Self::Fail),
            0xC000_0002 => Some(Self::InvalidArgument),
            0xC000_0003 => Some(Self::NotImplemented),
            0xC000_0004 => Some(Self::OutOfMemory),
            _ => None,
        }
    }
}

impl Display for PetError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(fmt, "Invalid argument"),
            Self::Fail => write!(fmt, "Operation failed"),
            Self::NotImplemented => write!(fmt, "Host capability not implemented"),
            Self::OutOfMemory => write!(fmt, "Out of memory"),
        }?;
        write!(fmt, " (status 0x{:08X})", self.code())
    }
}

impl std::error::Error for PetError {}

pub type PetResult<T> = Result<T, PetError>;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    UnknownNode(usize),
    AlreadyParented { node: usize },
    RootNotRepeat,
    Detached { node: usize },
}

impl Display for BuildError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::UnknownNode(node) => write!(fmt, "Node #{} does not exist in the builder", node),
            Self::AlreadyParented { node } => {
                write!(fmt, "Node #{} was already added to another parent", node)
            }
            Self::RootNotRepeat => write!(fmt, "The root of a behavior tree must be a Repeat node"),
            Self::Detached { node } => {
                write!(fmt, "Node #{} is not reachable from the root", node)
            }
        }
    }
}

impl std::error::Error for BuildError {}

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyFileError {
    Truncated,
    BadMagic,
    BadEndianMarker(u32),
    UnsupportedVersion { version: u16, min_version: u16 },
    Malformed(&'static str),
}

impl Display for KeyFileError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Truncated => write!(fmt, "Key file is truncated"),
            Self::BadMagic => write!(fmt, "Key file magic does not match"),
            Self::BadEndianMarker(marker) => {
                write!(fmt, "Unrecognized endian marker 0x{:08X}", marker)
            }
            Self::UnsupportedVersion {
                version,
                min_version,
            } => write!(
                fmt,
                "Unsupported key file version {}.{} (minimum {}.{})",
                version >> 8,
                version & 0xFF,
                min_version >> 8,
                min_version & 0xFF
            ),
            Self::Malformed(what) => write!(fmt, "Malformed key file: {}", what),
        }
    }
}

impl std::error::Error for KeyFileError {}

impl From<KeyFileError> for PetError {
    fn from(_: KeyFileError) -> Self {
        Self::Fail
    }
}

#[derive(Debug)]
pub enum LoadYamlError {
    Yaml(serde_yaml::Error),
    MissingTree,
    MissingField {
        node_type: String,
        field: &'static str,
    },
    UnknownType(String),
    ChildCount {
        node_type: String,
        found: usize,
    },
    UnknownAction(String),
    UnknownSelector(String),
    UnknownContinuation(String),
    Build(BuildError),
}

impl Display for LoadYamlError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Yaml(e) => e.fmt(fmt),
            Self::MissingTree => write!(fmt, "The behavior_tree entry does not exist"),
            Self::MissingField { node_type, field } => {
                write!(fmt, "{} node is missing the {:?} field", node_type, field)
            }
            Self::UnknownType(name) => write!(fmt, "Unknown node type {:?}", name),
            Self::ChildCount { node_type, found } => {
                write!(fmt, "{} node cannot have {} children", node_type, found)
            }
            Self::UnknownAction(name) => write!(fmt, "Action not registered {:?}", name),
            Self::UnknownSelector(name) => write!(fmt, "Selector not registered {:?}", name),
            Self::UnknownContinuation(name) => {
                write!(fmt, "Continuation not registered {:?}", name)
            }
            Self::Build(e) => e.fmt(fmt),
        }
    }
}

impl std::error::Error for LoadYamlError {}

impl From<serde_yaml::Error> for LoadYamlError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err)
    }
}

impl From<BuildError> for LoadYamlError {
    fn from(err: BuildError) -> Self {
        Self::Build(err)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Yaml(serde_yaml::Error),
}

impl Display for ConfigError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Yaml(e) => write!(fmt, "Invalid runtime configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err)
    }
}
