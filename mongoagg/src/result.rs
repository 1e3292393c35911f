use crate::{codegen, pipeline};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("placement error: {0}")]
    Placement(#[from] pipeline::Error),
    #[error("codegen error: {0}")]
    Codegen(#[from] codegen::Error),
    #[error("collection name must not be empty")]
    EmptyCollectionName,
}
