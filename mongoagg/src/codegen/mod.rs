use crate::context;
use thiserror::Error;

mod expressions;
mod match_query;
mod stages;

#[cfg(test)]
mod test;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("conditional expression is missing its else branch")]
    IncompleteConditional,
    #[error("{function} expects {expected} argument(s), found {found}")]
    InvalidArity {
        function: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{function} expects at least one argument")]
    EmptyVariadic { function: &'static str },
    #[error("duplicate grouping key '{0}'")]
    DuplicateGroupKey(String),
    #[error("duplicate accumulator alias '{0}'")]
    DuplicateGroupAlias(String),
    #[error(transparent)]
    Binding(#[from] context::Error),
}

/// Lowers stages, expressions, and criteria into their wire document forms.
/// Stateless; every method borrows its input so rendering is repeatable.
#[derive(Clone, Debug, Default)]
pub struct MqlCodeGenerator {}
