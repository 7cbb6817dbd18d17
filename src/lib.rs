//! Help desk lookups against Active Directory.
//!
//! Searches are described as clauses ([`filter::FilterClause`]), compiled
//! into an LDAP filter, run through a [`directory::DirectoryClient`] and
//! narrowed down to a single object by [`select::select`].

use ldap3::{LdapError, LdapResult};
use std::fmt;

pub mod commands;
pub mod config;
pub mod directory;
pub mod filter;
pub mod record;
pub mod select;
pub mod sheet;
pub mod terminal;

pub use config::Config;
pub use directory::{Conn, DirectoryClient, ObjectKind};
pub use filter::{CompiledQuery, FilterClause, QuerySpec, ValidationFault};
pub use record::{DirectoryEntry, Record, Value};
pub use select::{DisplayColumn, Selection, SelectionFault};

/// Rsults produced by the crate
pub type Result<T> = ::std::result::Result<T, Error>;

/// Errors produced by the interface
#[derive(Debug)]
pub enum Error {
    /// A search matched nothing
    NoResults,
    /// The credentials used to authenticate were invalid
    InvalidCredentials,
    /// An attribute was missing from a search result
    AttributeMissing(&'static str),
    /// The command line asked for something that makes no sense
    Usage(String),
    InvalidConfig(String),
    Validation(ValidationFault),
    Selection(SelectionFault),
    Ldap(LdapResult),
    Connection(LdapError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Toml(toml::de::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;
        match self {
            NoResults => write!(f, "No results were found for the search"),
            InvalidCredentials => write!(f, "Invalid user credentials"),
            AttributeMissing(attr) => write!(f, "Response was missing attribute: {}", attr),
            Usage(message) => write!(f, "{}", message),
            InvalidConfig(message) => write!(f, "Invalid configuration: {}", message),
            Validation(error) => write!(f, "{}", error),
            Selection(error) => write!(f, "{}", error),
            Ldap(error) => write!(f, "{}", error),
            Connection(error) => write!(f, "{}", error),
            Io(error) => write!(f, "{}", error),
            Json(error) => write!(f, "{}", error),
            Toml(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for Error {}

impl From<LdapResult> for Error {
    fn from(error: LdapResult) -> Self {
        match error {
            LdapResult { rc: 49, .. } => Error::InvalidCredentials,
            error => Error::Ldap(error),
        }
    }
}

impl From<LdapError> for Error {
    fn from(error: LdapError) -> Self {
        match error {
            LdapError::LdapResult { result } => result.into(),
            error => Error::Connection(error),
        }
    }
}

impl From<ValidationFault> for Error {
    fn from(error: ValidationFault) -> Self {
        Error::Validation(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json(error)
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Toml(error)
    }
}
