pub mod enums;
pub mod message;
pub mod patient;
pub mod user;

pub use enums::*;
pub use message::*;
pub use patient::*;
pub use user::*;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Unknown registration field: {0}")]
    UnknownField(String),
}
