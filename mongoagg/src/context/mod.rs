//! The field binding context threaded through a pipeline while it renders.
//! Each stage is rendered against the context produced by the stage before
//! it; `advance` derives the context the next stage will see.

use crate::{air, mapping_registry::FieldMappingRegistry};
use itertools::Itertools;
use thiserror::Error;


pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("field reference '{path}' cannot be resolved; visible fields are [{visible}]")]
    FieldNotFound { path: String, visible: String },
    #[error("unknown system variable '{0}'")]
    UnknownSystemVariable(String),
    #[error("no previous stage to reference")]
    NoPreviousStage,
    #[error("previous stage exposes no fields")]
    PreviousStageExposesNoFields,
}

/// The root-document marker: refers to the entire document a stage sees.
pub const ROOT: &str = "$$ROOT";
pub const CURRENT: &str = "$$CURRENT";

/// A field name made visible to stages after the current one. `target` is
/// the wire-level path when it differs from the logical name (a composite
/// group key `state` lives at `_id.state`); `synthetic` marks fields
/// manufactured by a stage rather than carried over from its input.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ExposedField {
    pub name: String,
    pub target: Option<String>,
    pub synthetic: bool,
}

impl ExposedField {
    pub fn named(name: impl Into<String>) -> Self {
        ExposedField {
            name: name.into(),
            target: None,
            synthetic: false,
        }
    }

    pub fn synthetic(name: impl Into<String>, target: Option<String>) -> Self {
        ExposedField {
            name: name.into(),
            target,
            synthetic: true,
        }
    }

    pub fn wire_path(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.name)
    }
}

/// An insertion-ordered set of exposed fields, unique by logical name.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct ExposedFields(Vec<ExposedField>);

impl ExposedFields {
    pub fn none() -> Self {
        ExposedFields(vec![])
    }

    /// Adds a field, superseding any previously exposed field of the same
    /// name in place.
    pub fn expose(&mut self, field: ExposedField) {
        match self.0.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.0.push(field),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ExposedField> {
        self.0.iter().find(|f| f.name == name)
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|f| f.name != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExposedField> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The field a `previous_operation()` reference resolves to: the first
    /// synthetic field if the stage manufactured one, else the first field
    /// it declared.
    pub fn principal(&self) -> Option<&ExposedField> {
        self.0.iter().find(|f| f.synthetic).or_else(|| self.0.first())
    }

    fn names_joined(&self) -> String {
        self.0.iter().map(|f| f.name.as_str()).join(", ")
    }
}

impl From<Vec<ExposedField>> for ExposedFields {
    fn from(fields: Vec<ExposedField>) -> Self {
        let mut set = ExposedFields::none();
        for field in fields {
            set.expose(field);
        }
        set
    }
}

/// How field paths resolve at a given point of the pipeline. Before any
/// stage has declared an output shape the document schema is unknown, so
/// paths pass through (after consulting the mapping registry for renamed
/// domain properties). Once a stage replaces the field set, only its
/// exposed fields resolve.
#[derive(PartialEq, Debug, Clone)]
enum FieldLookup {
    Relaxed { registry: FieldMappingRegistry },
    Strict(ExposedFields),
}

#[derive(PartialEq, Debug, Clone)]
pub struct AggregationContext {
    lookup: FieldLookup,
    previous: Option<ExposedFields>,
}

/// What a stage does to the visible field set, per the context rules.
enum StageOutput {
    Preserving,
    Additive {
        add: Vec<ExposedField>,
        remove: Vec<String>,
    },
    Replacing(ExposedFields),
    Opaque,
}

impl AggregationContext {
    /// The context the first stage of an untyped aggregation sees: root
    /// document visible, no named fields, empty previous-stage slot.
    pub fn initial() -> Self {
        Self::typed(FieldMappingRegistry::default())
    }

    /// Like `initial`, but field-path root segments resolve through the
    /// given registry until the first replacing stage.
    pub fn typed(registry: FieldMappingRegistry) -> Self {
        AggregationContext {
            lookup: FieldLookup::Relaxed { registry },
            previous: None,
        }
    }

    /// The exposed field set when the context is strict; `None` while the
    /// document shape is unknown.
    pub fn exposed_fields(&self) -> Option<&ExposedFields> {
        match &self.lookup {
            FieldLookup::Relaxed { .. } => None,
            FieldLookup::Strict(fields) => Some(fields),
        }
    }

    /// Resolves a dotted field path to its wire-level path (no `$` prefix).
    /// Sub-paths below a resolvable root segment pass through verbatim for
    /// database-side resolution.
    pub fn resolve_field_path(&self, path: &str) -> Result<String> {
        if let Some(rest) = path.strip_prefix("$$") {
            let root = rest.split('.').next().unwrap_or(rest);
            return match root {
                "ROOT" | "CURRENT" => Ok(path.to_string()),
                _ => Err(Error::UnknownSystemVariable(path.to_string())),
            };
        }

        let (root, rest) = match path.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (path, None),
        };

        let mapped_root = match &self.lookup {
            FieldLookup::Relaxed { registry } => registry
                .get(root)
                .cloned()
                .unwrap_or_else(|| root.to_string()),
            FieldLookup::Strict(fields) => match fields.get(root) {
                Some(field) => field.wire_path().to_string(),
                None => {
                    return Err(Error::FieldNotFound {
                        path: path.to_string(),
                        visible: fields.names_joined(),
                    })
                }
            },
        };

        Ok(match rest {
            Some(rest) => format!("{mapped_root}.{rest}"),
            None => mapped_root,
        })
    }

    /// Resolves the one-stage lookback: the wire path of the immediately
    /// preceding stage's principal output field.
    pub fn previous_operation_target(&self) -> Result<String> {
        let previous = self.previous.as_ref().ok_or(Error::NoPreviousStage)?;
        previous
            .principal()
            .map(|f| f.wire_path().to_string())
            .ok_or(Error::PreviousStageExposesNoFields)
    }

    /// Computes the context the stage *after* `stage` will see. The
    /// previous-stage slot always becomes `stage`'s own declared output
    /// set; it is a one-stage memory, never a history.
    pub fn advance(&self, stage: &air::Stage) -> AggregationContext {
        let (lookup, own) = match stage_output(stage) {
            StageOutput::Preserving => (self.lookup.clone(), ExposedFields::none()),
            StageOutput::Additive { add, remove } => {
                let own = ExposedFields::from(add.clone());
                let lookup = match &self.lookup {
                    FieldLookup::Relaxed { .. } => self.lookup.clone(),
                    FieldLookup::Strict(fields) => {
                        let mut next = fields.clone();
                        for name in &remove {
                            next.remove(name);
                        }
                        for field in add {
                            next.expose(field);
                        }
                        FieldLookup::Strict(next)
                    }
                };
                (lookup, own)
            }
            StageOutput::Replacing(fields) => {
                (FieldLookup::Strict(fields.clone()), fields)
            }
            StageOutput::Opaque => (
                FieldLookup::Relaxed {
                    registry: FieldMappingRegistry::default(),
                },
                ExposedFields::none(),
            ),
        };
        AggregationContext {
            lookup,
            previous: Some(own),
        }
    }
}

fn stage_output(stage: &air::Stage) -> StageOutput {
    use air::Stage::*;
    match stage {
        Match(_) | Sort(_) | Limit(_) | Skip(_) | Out(_) | Merge(_) => StageOutput::Preserving,
        Unwind(u) => match &u.index {
            Some(index) => StageOutput::Additive {
                add: vec![ExposedField::named(index.clone())],
                remove: vec![],
            },
            None => StageOutput::Preserving,
        },
        Lookup(l) => StageOutput::Additive {
            add: vec![ExposedField::named(l.as_field.clone())],
            remove: vec![],
        },
        GeoNear(g) => StageOutput::Additive {
            add: vec![ExposedField::named(g.distance_field.clone())],
            remove: vec![],
        },
        AddFields(af) => StageOutput::Additive {
            add: af
                .specifications
                .iter()
                .map(|pair| ExposedField::named(pair.name.clone()))
                .collect(),
            remove: vec![],
        },
        Project(p) => {
            if p.defines_new_shape() {
                StageOutput::Replacing(project_exposed_fields(p))
            } else {
                let mut add = vec![];
                let mut remove = vec![];
                for entry in &p.specifications {
                    match entry.spec {
                        air::ProjectionSpec::Include => {
                            add.push(ExposedField::named(entry.target.clone()))
                        }
                        air::ProjectionSpec::Exclude => remove.push(entry.target.clone()),
                        air::ProjectionSpec::Expr(_) => unreachable!(),
                    }
                }
                StageOutput::Additive { add, remove }
            }
        }
        Group(g) => StageOutput::Replacing(group_exposed_fields(g)),
        ReplaceRoot(_) => StageOutput::Opaque,
    }
}

fn project_exposed_fields(project: &air::Project) -> ExposedFields {
    let mut fields = ExposedFields::none();
    for entry in &project.specifications {
        match entry.spec {
            air::ProjectionSpec::Exclude => fields.remove(&entry.target),
            _ => fields.expose(ExposedField::named(entry.target.clone())),
        }
    }
    fields
}

/// A group hides everything but its own output: the synthetic `_id`,
/// composite key names (addressable directly, as `_id.<name>` on the wire,
/// not nested under an implicit identifier), and the accumulator aliases.
/// A single key has no sub-name of its own; it is reachable as `_id` or
/// through the previous-operation lookback, never by its pre-group name.
fn group_exposed_fields(group: &air::Group) -> ExposedFields {
    let mut fields = ExposedFields::none();
    fields.expose(ExposedField::synthetic("_id", None));
    if group.keys.len() > 1 {
        for key in &group.keys {
            fields.expose(ExposedField::synthetic(
                key.name.clone(),
                Some(format!("_id.{}", key.name)),
            ));
        }
    }
    for acc in &group.aggregations {
        fields.expose(ExposedField::named(acc.alias.clone()));
    }
    fields
}
