/// One step of an aggregation pipeline. Each variant renders to exactly one
/// wire document keyed by its operator name. Ordering lives in the
/// `Pipeline`; stages do not reference one another.
#[derive(PartialEq, Debug, Clone)]
pub enum Stage {
    Match(Match),
    Project(Project),
    AddFields(AddFields),
    Group(Group),
    Sort(Sort),
    Unwind(Unwind),
    Limit(Limit),
    Skip(Skip),
    Lookup(Lookup),
    GeoNear(GeoNear),
    ReplaceRoot(ReplaceRoot),
    Out(Out),
    Merge(Merge),
}

impl Stage {
    pub fn operator(&self) -> &'static str {
        use Stage::*;
        match self {
            Match(_) => "$match",
            Project(_) => "$project",
            AddFields(_) => "$addFields",
            Group(_) => "$group",
            Sort(_) => "$sort",
            Unwind(_) => "$unwind",
            Limit(_) => "$limit",
            Skip(_) => "$skip",
            Lookup(_) => "$lookup",
            GeoNear(_) => "$geoNear",
            ReplaceRoot(_) => "$replaceRoot",
            Out(_) => "$out",
            Merge(_) => "$merge",
        }
    }
}

macro_rules! impl_from_stage {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Stage {
                fn from(stage: $variant) -> Self {
                    Stage::$variant(stage)
                }
            }
        )*
    };
}

impl_from_stage!(
    Match, Project, AddFields, Group, Sort, Unwind, Limit, Skip, Lookup, GeoNear, ReplaceRoot,
    Out, Merge
);

#[derive(PartialEq, Debug, Clone)]
pub struct Match {
    pub query: MatchQuery,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Project {
    pub specifications: Vec<ProjectionEntry>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ProjectionEntry {
    pub target: String,
    pub spec: ProjectionSpec,
}

#[derive(PartialEq, Debug, Clone)]
pub enum ProjectionSpec {
    Include,
    Exclude,
    Expr(Expression),
}

impl Project {
    /// A projection that computes or aliases anything defines a new document
    /// shape; a plain include/exclude list does not.
    pub fn defines_new_shape(&self) -> bool {
        self.specifications
            .iter()
            .any(|entry| matches!(entry.spec, ProjectionSpec::Expr(_)))
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct AddFields {
    pub specifications: Vec<NameExprPair>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Group {
    pub keys: Vec<NameExprPair>,
    pub aggregations: Vec<AccumulatorExpr>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct NameExprPair {
    pub name: String,
    pub expr: Expression,
}

#[derive(PartialEq, Debug, Clone)]
pub struct AccumulatorExpr {
    pub alias: String,
    pub function: AggregationFunction,
    pub arg: Box<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AggregationFunction {
    AddToSet,
    Avg,
    Count,
    First,
    Last,
    Max,
    Min,
    Push,
    Sum,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Sort {
    pub specs: Vec<SortSpecification>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct SortSpecification {
    pub key: SortKey,
    pub direction: SortDirection,
}

/// Sort keys are document keys on the wire, so they are field names rather
/// than expressions. `PreviousOperation` is the one-stage lookback marker.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum SortKey {
    Field(String),
    PreviousOperation,
}

impl From<&str> for SortKey {
    fn from(name: &str) -> Self {
        SortKey::Field(name.to_string())
    }
}

impl From<String> for SortKey {
    fn from(name: String) -> Self {
        SortKey::Field(name)
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Unwind {
    pub path: FieldRef,
    pub index: Option<String>,
    pub preserve_null_and_empty_arrays: bool,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Limit {
    pub limit: u64,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Skip {
    pub skip: u64,
}

/// Joins against a named external collection. The foreign side is opaque:
/// `foreign_field` is emitted verbatim, only `local_field` resolves against
/// the current binding context.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Lookup {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
}

#[derive(PartialEq, Debug, Clone)]
pub struct GeoNear {
    pub near: (f64, f64),
    pub distance_field: String,
    pub spherical: bool,
    pub max_distance: Option<f64>,
    pub query: Option<MatchQuery>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ReplaceRoot {
    pub new_root: Box<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Out {
    pub collection: String,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Merge {
    pub into: String,
    pub on: Option<String>,
}

/// The embedded expression sub-language. Every `FieldRef` resolves against
/// the *input* context of the stage holding the expression; a stage never
/// references fields it is itself defining.
#[derive(PartialEq, Debug, Clone)]
pub enum Expression {
    Literal(LiteralValue),
    FieldRef(FieldRef),
    Binary(BinaryExpr),
    Conditional(Conditional),
    StringFunction(StringFunction),
    DateExtract(DateExtract),
    PreviousStageRef,
}

/// A dotted path naming a field as seen by the current stage, or a system
/// variable path (`$$ROOT`, `$$CURRENT`) referring to the whole document.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct FieldRef {
    pub path: String,
}

impl FieldRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BinaryOperator {
    // Arithmetic operators
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,

    // Comparison operators
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// `otherwise` stays optional so an incomplete conditional is representable;
/// rendering rejects it before lowering.
#[derive(PartialEq, Debug, Clone)]
pub struct Conditional {
    pub predicate: Box<Expression>,
    pub then: Box<Expression>,
    pub otherwise: Option<Box<Expression>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct StringFunction {
    pub function: StringOperator,
    pub args: Vec<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum StringOperator {
    Concat,
    ToUpper,
    ToLower,
    StrLenCp,
    SubstrCp,
    Split,
}

impl StringOperator {
    /// `None` means variadic (at least one argument).
    pub fn arity(&self) -> Option<usize> {
        use StringOperator::*;
        match self {
            Concat => None,
            ToUpper => Some(1),
            ToLower => Some(1),
            StrLenCp => Some(1),
            SubstrCp => Some(3),
            Split => Some(2),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct DateExtract {
    pub part: DatePart,
    pub source: Box<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum DatePart {
    Year,
    Month,
    Week,
    DayOfMonth,
    DayOfYear,
    Hour,
    Minute,
    Second,
}

#[derive(PartialEq, Debug, Clone)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    String(String),
    Integer(i32),
    Long(i64),
    Double(f64),
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        LiteralValue::Boolean(b)
    }
}

impl From<i32> for LiteralValue {
    fn from(i: i32) -> Self {
        LiteralValue::Integer(i)
    }
}

impl From<i64> for LiteralValue {
    fn from(l: i64) -> Self {
        LiteralValue::Long(l)
    }
}

impl From<f64> for LiteralValue {
    fn from(d: f64) -> Self {
        LiteralValue::Double(d)
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        LiteralValue::String(s.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(s: String) -> Self {
        LiteralValue::String(s)
    }
}

/// The generic filter-criteria sub-language used by `$match` and
/// `$geoNear` queries. Field names resolve against the stage's input
/// context; argument values are literals.
#[derive(PartialEq, Debug, Clone)]
pub enum MatchQuery {
    And(Vec<MatchQuery>),
    Or(Vec<MatchQuery>),
    Comparison(MatchComparison),
    In(MatchIn),
    Regex(MatchRegex),
    Exists(MatchExists),
}

#[derive(PartialEq, Debug, Clone)]
pub struct MatchComparison {
    pub field: String,
    pub function: MatchComparisonOp,
    pub arg: LiteralValue,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum MatchComparisonOp {
    Lt,
    Lte,
    Ne,
    Eq,
    Gt,
    Gte,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MatchIn {
    pub field: String,
    pub values: Vec<LiteralValue>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct MatchRegex {
    pub field: String,
    pub regex: String,
    pub options: String,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct MatchExists {
    pub field: String,
    pub exists: bool,
}
