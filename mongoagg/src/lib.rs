//! Compiles strongly-typed aggregation pipelines into the wire-level
//! document sequence MongoDB's aggregation engine executes. The compiler is
//! a pure transformation: build a [`pipeline::Pipeline`] from stage values,
//! render it, hand the documents to the driver.

pub mod air;
mod codegen;
pub mod context;
pub mod mapping_registry;
pub mod options;
pub mod pipeline;
pub mod result;
mod util;

use crate::{
    context::AggregationContext, mapping_registry::FieldMappingRegistry,
    options::AggregationOptions, pipeline::Pipeline, result::Result,
};
use bson::{doc, Bson, Document};

/// A pipeline bound to the field mapping of its domain type (empty for
/// untyped aggregations) plus execution options.
#[derive(PartialEq, Debug, Clone)]
pub struct Aggregation {
    registry: FieldMappingRegistry,
    pipeline: Pipeline,
    options: AggregationOptions,
}

impl Aggregation {
    pub fn new(pipeline: Pipeline) -> Self {
        Self::typed(FieldMappingRegistry::default(), pipeline)
    }

    /// An aggregation over a mapped domain type: field-path root segments
    /// resolve through `registry` until the first replacing stage.
    pub fn typed(registry: FieldMappingRegistry, pipeline: Pipeline) -> Self {
        Aggregation {
            registry,
            pipeline,
            options: AggregationOptions::default(),
        }
    }

    pub fn with_options(self, options: AggregationOptions) -> Self {
        Aggregation { options, ..self }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Renders the pipeline into its wire documents, one per stage.
    pub fn render(&self) -> Result<Vec<Document>> {
        self.pipeline
            .render(AggregationContext::typed(self.registry.clone()))
    }
}

/// Everything the execution collaborator needs to run an aggregation
/// against a named input collection.
#[derive(PartialEq, Debug, Clone)]
pub struct AggregationCommand {
    pub collection: String,
    pub pipeline: Vec<Document>,
    pub options: AggregationOptions,
}

impl AggregationCommand {
    /// The full `aggregate` command document, options applied verbatim.
    pub fn command_document(&self) -> Document {
        let mut command = doc! {
            "aggregate": self.collection.clone(),
            "pipeline": self
                .pipeline
                .iter()
                .cloned()
                .map(Bson::Document)
                .collect::<Vec<_>>(),
        };
        self.options.apply_to_command(&mut command);
        command
    }
}

/// Validates and renders `aggregation`, packaging the result for execution
/// against `collection`.
pub fn build_aggregate_command(
    aggregation: &Aggregation,
    collection: &str,
) -> Result<AggregationCommand> {
    if collection.is_empty() {
        return Err(result::Error::EmptyCollectionName);
    }
    let pipeline = aggregation.render()?;
    Ok(AggregationCommand {
        collection: collection.to_string(),
        pipeline,
        options: aggregation.options.clone(),
    })
}
