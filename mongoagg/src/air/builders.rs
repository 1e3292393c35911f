//! Pure builder functions for stages, expressions, and criteria. Every step
//! consumes its receiver and returns a new value; the only mutation in the
//! whole crate is pipeline append.

use crate::air::definitions::*;

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

pub fn field(path: impl Into<String>) -> Expression {
    Expression::FieldRef(FieldRef::new(path))
}

pub fn lit(value: impl Into<LiteralValue>) -> Expression {
    Expression::Literal(value.into())
}

pub fn null_lit() -> Expression {
    Expression::Literal(LiteralValue::Null)
}

pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpr {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn string_function(function: StringOperator, args: Vec<Expression>) -> Expression {
    Expression::StringFunction(StringFunction { function, args })
}

pub fn date_part(part: DatePart, source: Expression) -> Expression {
    Expression::DateExtract(DateExtract {
        part,
        source: Box::new(source),
    })
}

/// Entry point for conditionals: `when(pred).then(a).otherwise(b)`.
/// `ConditionalThen` converts into an `Expression` without the else branch,
/// which rendering later rejects as malformed.
pub fn when(predicate: Expression) -> ConditionalBuilder {
    ConditionalBuilder { predicate }
}

#[derive(Debug, Clone)]
pub struct ConditionalBuilder {
    predicate: Expression,
}

impl ConditionalBuilder {
    pub fn then(self, then: Expression) -> ConditionalThen {
        ConditionalThen {
            predicate: self.predicate,
            then,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConditionalThen {
    predicate: Expression,
    then: Expression,
}

impl ConditionalThen {
    pub fn otherwise(self, otherwise: Expression) -> Expression {
        Expression::Conditional(Conditional {
            predicate: Box::new(self.predicate),
            then: Box::new(self.then),
            otherwise: Some(Box::new(otherwise)),
        })
    }
}

impl From<ConditionalThen> for Expression {
    fn from(partial: ConditionalThen) -> Self {
        Expression::Conditional(Conditional {
            predicate: Box::new(partial.predicate),
            then: Box::new(partial.then),
            otherwise: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

pub fn criteria(field: impl Into<String>) -> CriteriaField {
    CriteriaField {
        field: field.into(),
    }
}

#[derive(Debug, Clone)]
pub struct CriteriaField {
    field: String,
}

impl CriteriaField {
    fn comparison(self, function: MatchComparisonOp, arg: impl Into<LiteralValue>) -> MatchQuery {
        MatchQuery::Comparison(MatchComparison {
            field: self.field,
            function,
            arg: arg.into(),
        })
    }

    pub fn eq(self, arg: impl Into<LiteralValue>) -> MatchQuery {
        self.comparison(MatchComparisonOp::Eq, arg)
    }

    pub fn ne(self, arg: impl Into<LiteralValue>) -> MatchQuery {
        self.comparison(MatchComparisonOp::Ne, arg)
    }

    pub fn gt(self, arg: impl Into<LiteralValue>) -> MatchQuery {
        self.comparison(MatchComparisonOp::Gt, arg)
    }

    pub fn gte(self, arg: impl Into<LiteralValue>) -> MatchQuery {
        self.comparison(MatchComparisonOp::Gte, arg)
    }

    pub fn lt(self, arg: impl Into<LiteralValue>) -> MatchQuery {
        self.comparison(MatchComparisonOp::Lt, arg)
    }

    pub fn lte(self, arg: impl Into<LiteralValue>) -> MatchQuery {
        self.comparison(MatchComparisonOp::Lte, arg)
    }

    pub fn is_in(self, values: Vec<LiteralValue>) -> MatchQuery {
        MatchQuery::In(MatchIn {
            field: self.field,
            values,
        })
    }

    pub fn regex(self, regex: impl Into<String>, options: impl Into<String>) -> MatchQuery {
        MatchQuery::Regex(MatchRegex {
            field: self.field,
            regex: regex.into(),
            options: options.into(),
        })
    }

    pub fn exists(self, exists: bool) -> MatchQuery {
        MatchQuery::Exists(MatchExists {
            field: self.field,
            exists,
        })
    }
}

impl MatchQuery {
    pub fn and(self, other: MatchQuery) -> MatchQuery {
        match self {
            MatchQuery::And(mut queries) => {
                queries.push(other);
                MatchQuery::And(queries)
            }
            q => MatchQuery::And(vec![q, other]),
        }
    }

    pub fn or(self, other: MatchQuery) -> MatchQuery {
        match self {
            MatchQuery::Or(mut queries) => {
                queries.push(other);
                MatchQuery::Or(queries)
            }
            q => MatchQuery::Or(vec![q, other]),
        }
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

pub fn matching(query: MatchQuery) -> Match {
    Match { query }
}

pub fn project<const N: usize>(fields: [&str; N]) -> Project {
    Project {
        specifications: fields
            .into_iter()
            .map(|f| ProjectionEntry {
                target: f.into(),
                spec: ProjectionSpec::Include,
            })
            .collect(),
    }
}

impl Project {
    /// Starts a computed or aliased entry named `target`.
    pub fn and(self, target: impl Into<String>) -> ProjectField {
        ProjectField {
            project: self,
            target: target.into(),
        }
    }

    pub fn and_exclude(mut self, name: impl Into<String>) -> Project {
        self.specifications.push(ProjectionEntry {
            target: name.into(),
            spec: ProjectionSpec::Exclude,
        });
        self
    }

    pub fn and_include(mut self, name: impl Into<String>) -> Project {
        self.specifications.push(ProjectionEntry {
            target: name.into(),
            spec: ProjectionSpec::Include,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct ProjectField {
    project: Project,
    target: String,
}

impl ProjectField {
    fn complete(mut self, spec: ProjectionSpec) -> Project {
        self.project.specifications.push(ProjectionEntry {
            target: self.target,
            spec,
        });
        self.project
    }

    /// The new field carries whatever the immediately preceding stage's
    /// principal output was (e.g. a group key).
    pub fn previous_operation(self) -> Project {
        self.complete(ProjectionSpec::Expr(Expression::PreviousStageRef))
    }

    /// Alias of another field as seen by this stage's input context.
    pub fn from_field(self, path: impl Into<String>) -> Project {
        self.complete(ProjectionSpec::Expr(field(path)))
    }

    pub fn from_expression(self, expr: impl Into<Expression>) -> Project {
        self.complete(ProjectionSpec::Expr(expr.into()))
    }
}

pub fn add_fields() -> AddFields {
    AddFields {
        specifications: vec![],
    }
}

impl AddFields {
    pub fn set(mut self, name: impl Into<String>, expr: impl Into<Expression>) -> AddFields {
        self.specifications.push(NameExprPair {
            name: name.into(),
            expr: expr.into(),
        });
        self
    }
}

pub fn group<const N: usize>(keys: [&str; N]) -> Group {
    Group {
        keys: keys
            .into_iter()
            .map(|k| {
                let name = k.to_string();
                let expr = field(name.clone());
                NameExprPair { name, expr }
            })
            .collect(),
        aggregations: vec![],
    }
}

impl Group {
    /// Adds a grouping key computed from an arbitrary expression.
    pub fn key(mut self, name: impl Into<String>, expr: impl Into<Expression>) -> Group {
        self.keys.push(NameExprPair {
            name: name.into(),
            expr: expr.into(),
        });
        self
    }

    pub fn accumulate(
        mut self,
        function: AggregationFunction,
        arg: Expression,
        alias: impl Into<String>,
    ) -> Group {
        self.aggregations.push(AccumulatorExpr {
            alias: alias.into(),
            function,
            arg: Box::new(arg),
        });
        self
    }

    pub fn count(self, alias: impl Into<String>) -> Group {
        self.accumulate(
            AggregationFunction::Count,
            Expression::Literal(LiteralValue::Integer(1)),
            alias,
        )
    }

    pub fn sum(self, source: impl Into<String>, alias: impl Into<String>) -> Group {
        self.accumulate(AggregationFunction::Sum, field(source), alias)
    }

    pub fn avg(self, source: impl Into<String>, alias: impl Into<String>) -> Group {
        self.accumulate(AggregationFunction::Avg, field(source), alias)
    }

    pub fn min(self, source: impl Into<String>, alias: impl Into<String>) -> Group {
        self.accumulate(AggregationFunction::Min, field(source), alias)
    }

    pub fn max(self, source: impl Into<String>, alias: impl Into<String>) -> Group {
        self.accumulate(AggregationFunction::Max, field(source), alias)
    }

    pub fn first(self, source: impl Into<String>, alias: impl Into<String>) -> Group {
        self.accumulate(AggregationFunction::First, field(source), alias)
    }

    pub fn last(self, source: impl Into<String>, alias: impl Into<String>) -> Group {
        self.accumulate(AggregationFunction::Last, field(source), alias)
    }

    pub fn push(self, source: impl Into<String>, alias: impl Into<String>) -> Group {
        self.accumulate(AggregationFunction::Push, field(source), alias)
    }

    pub fn add_to_set(self, source: impl Into<String>, alias: impl Into<String>) -> Group {
        self.accumulate(AggregationFunction::AddToSet, field(source), alias)
    }
}

pub fn sort<I, K>(direction: SortDirection, keys: I) -> Sort
where
    I: IntoIterator<Item = K>,
    K: Into<SortKey>,
{
    Sort { specs: vec![] }.and(direction, keys)
}

/// The one-stage lookback marker, usable as a sort key.
pub fn previous_operation() -> SortKey {
    SortKey::PreviousOperation
}

impl Sort {
    pub fn and<I, K>(mut self, direction: SortDirection, keys: I) -> Sort
    where
        I: IntoIterator<Item = K>,
        K: Into<SortKey>,
    {
        self.specs.extend(keys.into_iter().map(|key| SortSpecification {
            key: key.into(),
            direction,
        }));
        self
    }
}

pub fn unwind(path: impl Into<String>) -> Unwind {
    Unwind {
        path: FieldRef::new(path),
        index: None,
        preserve_null_and_empty_arrays: false,
    }
}

impl Unwind {
    pub fn with_index(self, index: impl Into<String>) -> Unwind {
        Unwind {
            index: Some(index.into()),
            ..self
        }
    }

    /// Keeps documents whose array is absent or empty, with a null element.
    /// Affects the exposed field's nullability, not the document shape.
    pub fn preserve_null_and_empty_arrays(self) -> Unwind {
        Unwind {
            preserve_null_and_empty_arrays: true,
            ..self
        }
    }
}

pub fn limit(limit: u64) -> Limit {
    Limit { limit }
}

pub fn skip(skip: u64) -> Skip {
    Skip { skip }
}

pub fn lookup(
    from: impl Into<String>,
    local_field: impl Into<String>,
    foreign_field: impl Into<String>,
    as_field: impl Into<String>,
) -> Lookup {
    Lookup {
        from: from.into(),
        local_field: local_field.into(),
        foreign_field: foreign_field.into(),
        as_field: as_field.into(),
    }
}

pub fn geo_near(near: (f64, f64), distance_field: impl Into<String>) -> GeoNear {
    GeoNear {
        near,
        distance_field: distance_field.into(),
        spherical: false,
        max_distance: None,
        query: None,
    }
}

impl GeoNear {
    pub fn spherical(self) -> GeoNear {
        GeoNear {
            spherical: true,
            ..self
        }
    }

    pub fn max_distance(self, meters: f64) -> GeoNear {
        GeoNear {
            max_distance: Some(meters),
            ..self
        }
    }

    pub fn query(self, query: MatchQuery) -> GeoNear {
        GeoNear {
            query: Some(query),
            ..self
        }
    }
}

pub fn replace_root(new_root: impl Into<Expression>) -> ReplaceRoot {
    ReplaceRoot {
        new_root: Box::new(new_root.into()),
    }
}

pub fn out(collection: impl Into<String>) -> Out {
    Out {
        collection: collection.into(),
    }
}

pub fn merge_into(collection: impl Into<String>) -> Merge {
    Merge {
        into: collection.into(),
        on: None,
    }
}

impl Merge {
    pub fn on(self, field: impl Into<String>) -> Merge {
        Merge {
            on: Some(field.into()),
            ..self
        }
    }
}
