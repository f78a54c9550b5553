//! Error types for qc-compiler

use thiserror::Error;

/// Compilation error
///
/// Every failure aborts the compilation. Variants carry the identity of the
/// offending construct and, where known, the originating source construct.
#[derive(Error, Debug)]
pub enum CompileError {
    /// QC001: No lowering rule exists for the construct
    #[error("[QC001] Unsupported construct: {construct}")]
    UnsupportedConstruct { construct: String },

    /// QC002: The operator is known but this overload shape is not
    #[error("[QC002] Unsupported overload of '{operator}': {detail}")]
    UnsupportedOverload { operator: String, detail: String },

    /// QC003: Method has no translation at all
    #[error("[QC003] Method '{declaring}.{method}' has no supported translation")]
    UnsupportedMethod { declaring: String, method: String },

    /// QC004: Method is translatable, but not with these arguments
    #[error("[QC004] This form of '{declaring}.{method}' is not supported: {detail}")]
    UnsupportedMethodForm {
        declaring: String,
        method: String,
        detail: String,
    },

    /// QC005: Negative Skip/Take count
    #[error("[QC005] Argument '{argument}' of '{operator}' is out of range: {value}")]
    ArgumentOutOfRange {
        operator: String,
        argument: String,
        value: i64,
    },

    /// QC006: A compile-time constant is required
    #[error("[QC006] '{operator}' requires a constant argument, got {found}")]
    ConstantRequired { operator: String, found: String },

    /// QC007: NOT EXISTS paging needs an identifiable row
    #[error("[QC007] Skip requires a single-table query with primary keys, a DISTINCT projection or a UNION")]
    SkipRequiresSingleTableQueryWithPks,

    /// QC008: Skip over sequence-typed selections
    #[error("[QC008] Skip is not supported over sequence-typed selections")]
    SkipNotSupportedForSequenceTypes,

    /// QC009: Union legs with different shapes
    #[error("[QC009] Union legs have incompatible construction: {detail}")]
    UnionIncompatibleConstruction { detail: String },

    /// QC010: A comparison that SQL cannot express
    #[error("[QC010] Comparison between {left} and {right} is not supported")]
    ComparisonNotSupported { left: String, right: String },

    /// QC011: Intersect/Except over groupings
    #[error("[QC011] {operator} is not supported for hierarchical element type {element}")]
    IntersectNotSupportedForHierarchicalTypes { operator: String, element: String },

    /// QC012: Other semantic impossibilities
    #[error("[QC012] {message}")]
    SemanticImpossibility { message: String },

    /// QC013: Explicit construction of a mapped entity
    #[error("[QC013] Explicit construction of entity type '{type_name}' in a query is not allowed")]
    EntityConstructionNotAllowed { type_name: String },

    /// QC014: Table or queryable belongs to a different session
    #[error("[QC014] '{construct}' belongs to context '{found}', expected '{expected}'")]
    WrongDataContext {
        construct: String,
        expected: String,
        found: String,
    },

    /// QC015: A queryable that expands to itself
    #[error("[QC015] Queryable '{name}' references itself")]
    SelfReferencingQuery { name: String },

    /// QC016: Lambda parameter used outside its lambda
    #[error("[QC016] Parameter '{name}' is not in scope")]
    ParameterNotInScope { name: String },

    /// QC017: Member access that cannot be bound
    #[error("[QC017] Member '{member}' cannot be resolved on {target}")]
    UnresolvedMember { member: String, target: String },

    /// QC018: Aggregate over a structured type
    #[error("[QC018] Cannot aggregate values of type {type_name} with {aggregate}")]
    CannotAggregateType { aggregate: String, type_name: String },

    /// QC019: Ordering on a type that cannot be ordered
    #[error("[QC019] Type {type_name} cannot be used in ORDER BY")]
    TypeCannotBeOrdered { type_name: String },

    /// QC020: Stored procedure inside a composed query
    #[error("[QC020] Stored procedure '{name}' cannot be composed into a query")]
    SprocsCannotBeComposed { name: String },

    /// QC021: Identity member type cannot be read back
    #[error("[QC021] Member '{member}' has a db-generated type {db_type} that cannot be retrieved")]
    InvalidDbGeneratedType { member: String, db_type: String },

    /// QC022: Node survived binding into the renderer
    #[error("[QC022] Node '{node}' is not valid for {format} output")]
    InvalidNodeForFormat { node: String, format: String },

    /// QC023: Core error propagation
    #[error("[QC023] Core error: {0}")]
    Core(#[from] qc_core::CoreError),

    /// QC024: SQL crate error propagation
    #[error("[QC024] SQL error: {0}")]
    Sql(#[from] qc_sql::SqlError),
}

impl CompileError {
    /// Shorthand for [`CompileError::UnsupportedConstruct`]
    pub fn unsupported(construct: impl Into<String>) -> Self {
        CompileError::UnsupportedConstruct {
            construct: construct.into(),
        }
    }

    /// Shorthand for [`CompileError::UnsupportedMethodForm`]
    pub fn method_form(
        declaring: impl ToString,
        method: &str,
        detail: impl Into<String>,
    ) -> Self {
        CompileError::UnsupportedMethodForm {
            declaring: declaring.to_string(),
            method: method.to_string(),
            detail: detail.into(),
        }
    }

    /// Stable code such as `QC005`
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::UnsupportedConstruct { .. } => "QC001",
            CompileError::UnsupportedOverload { .. } => "QC002",
            CompileError::UnsupportedMethod { .. } => "QC003",
            CompileError::UnsupportedMethodForm { .. } => "QC004",
            CompileError::ArgumentOutOfRange { .. } => "QC005",
            CompileError::ConstantRequired { .. } => "QC006",
            CompileError::SkipRequiresSingleTableQueryWithPks => "QC007",
            CompileError::SkipNotSupportedForSequenceTypes => "QC008",
            CompileError::UnionIncompatibleConstruction { .. } => "QC009",
            CompileError::ComparisonNotSupported { .. } => "QC010",
            CompileError::IntersectNotSupportedForHierarchicalTypes { .. } => "QC011",
            CompileError::SemanticImpossibility { .. } => "QC012",
            CompileError::EntityConstructionNotAllowed { .. } => "QC013",
            CompileError::WrongDataContext { .. } => "QC014",
            CompileError::SelfReferencingQuery { .. } => "QC015",
            CompileError::ParameterNotInScope { .. } => "QC016",
            CompileError::UnresolvedMember { .. } => "QC017",
            CompileError::CannotAggregateType { .. } => "QC018",
            CompileError::TypeCannotBeOrdered { .. } => "QC019",
            CompileError::SprocsCannotBeComposed { .. } => "QC020",
            CompileError::InvalidDbGeneratedType { .. } => "QC021",
            CompileError::InvalidNodeForFormat { .. } => "QC022",
            CompileError::Core(_) => "QC023",
            CompileError::Sql(_) => "QC024",
        }
    }
}

/// Result type alias for CompileError
pub type CompileResult<T> = Result<T, CompileError>;
