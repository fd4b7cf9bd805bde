// Copyright @yucwang 2026

use std::fmt;

#[derive(Debug)]
pub enum ViewFactorError {
    InvalidConfig(String),
    /// Zero-area or normal-less top-level patch.
    DegenerateGeometry { patch: usize },
    /// A pair's work list went deeper than `max_depth`.
    ResourceExhaustion { pair: (usize, usize), depth: u32 },
    Io(std::io::Error),
    Parse(String),
    WorkerFailure(String),
}

impl From<std::io::Error> for ViewFactorError {
    fn from(err: std::io::Error) -> Self {
        ViewFactorError::Io(err)
    }
}

impl fmt::Display for ViewFactorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewFactorError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            ViewFactorError::DegenerateGeometry { patch } => {
                write!(f, "degenerate geometry in patch {}", patch)
            }
            ViewFactorError::ResourceExhaustion { pair, depth } => {
                write!(f, "pair ({}, {}) exceeded subdivision depth {}", pair.0, pair.1, depth)
            }
            ViewFactorError::Io(err) => write!(f, "io error: {}", err),
            ViewFactorError::Parse(msg) => write!(f, "parse error: {}", msg),
            ViewFactorError::WorkerFailure(msg) => write!(f, "worker failure: {}", msg),
        }
    }
}

impl std::error::Error for ViewFactorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewFactorError::Io(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewFactorError>;
