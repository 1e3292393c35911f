use crate::{air::Stage, codegen::MqlCodeGenerator, context::AggregationContext, result};
use lazy_static::lazy_static;
use log::{debug, trace};
use std::collections::BTreeSet;
use thiserror::Error;


pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error(
        "{operator} can only be used as the last stage of the pipeline (found at position {position})"
    )]
    TerminalStageNotLast {
        operator: &'static str,
        position: usize,
    },
}

lazy_static! {
    /// Operators only legal as a pipeline's final stage.
    static ref TERMINAL_OPERATORS: BTreeSet<&'static str> = crate::set! {"$out", "$merge"};
}

/// An ordered sequence of stages. Append-only while being assembled;
/// rendering borrows the pipeline and is repeatable.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline { stages: vec![] }
    }

    pub fn from_stages(stages: Vec<Stage>) -> Self {
        Pipeline { stages }
    }

    pub fn append(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn ends_with_terminal_stage(&self) -> bool {
        self.stages
            .last()
            .map(|stage| TERMINAL_OPERATORS.contains(stage.operator()))
            .unwrap_or(false)
    }

    /// Structural validation: a terminal operator anywhere but the final
    /// position is a placement error. Checked by position, so structurally
    /// identical stages at different indexes are not confused.
    pub fn validate(&self) -> Result<()> {
        for (position, stage) in self.stages.iter().enumerate() {
            let operator = stage.operator();
            if TERMINAL_OPERATORS.contains(operator) && position != self.stages.len() - 1 {
                return Err(Error::TerminalStageNotLast { operator, position });
            }
        }
        Ok(())
    }

    /// Folds the stage sequence into wire documents, one per stage, feeding
    /// each stage the context produced by the stage before it. Pure: the
    /// same pipeline renders to the same documents every time.
    pub fn render(&self, initial: AggregationContext) -> result::Result<Vec<bson::Document>> {
        self.validate()?;
        debug!("rendering aggregation pipeline with {} stages", self.stages.len());
        let generator = MqlCodeGenerator::default();
        let mut documents = Vec::with_capacity(self.stages.len());
        let mut ctx = initial;
        for stage in &self.stages {
            let document = generator.codegen_stage(stage, &ctx)?;
            trace!("rendered {} stage: {}", stage.operator(), document);
            ctx = ctx.advance(stage);
            documents.push(document);
        }
        Ok(documents)
    }
}
