//! tsbeacon core - domain types, content model, collaborator traits, errors

pub mod error;
pub mod representation;
pub mod service;
pub mod types;

pub use error::{Error, Result};
pub use representation::*;
pub use service::{MessageSink, StateSource};
pub use types::*;
