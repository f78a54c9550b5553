//! Relational IR - an arena of typed nodes addressed by [`NodeId`]
//!
//! Every stage mutates the same [`Ir`] in place. Owned children are reached
//! through [`NodeKind::children_mut`]; back-references (a column's owner, the
//! alias behind an `AliasRef`, the shared node behind a `SharedRef`, the
//! columns listed on a table) are reached through [`NodeKind::refs_mut`] and
//! are never walked as part of a subtree.

pub mod duplicate;
pub mod factory;

use qc_core::{Declaring, MemberName, TypeName, Value, ValueType};
use qc_sql::ProviderType;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stable handle of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position in the arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Join kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Cross,
    Inner,
    LeftOuter,
    CrossApply,
    OuterApply,
}

impl JoinKind {
    /// SQL keyword sequence
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::Inner => "INNER JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
            JoinKind::CrossApply => "CROSS APPLY",
            JoinKind::OuterApply => "OUTER APPLY",
        }
    }

    /// Right side may see the left side's aliases
    pub fn is_apply(self) -> bool {
        matches!(self, JoinKind::CrossApply | JoinKind::OuterApply)
    }

    /// Right side rows may be missing (values read through it may be NULL)
    pub fn is_outer(self) -> bool {
        matches!(self, JoinKind::LeftOuter | JoinKind::OuterApply)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    /// Negation that maps NULL to true (`NOT` under two-valued semantics)
    Not2V,
    Negate,
    BitNot,
    IsNull,
    IsNotNull,
    /// CONVERT to the node's type
    Convert,
    /// Reinterpret as a derived entity type; NULL when not assignable
    Treat,
    /// A value read through an outer join or outer apply
    OuterJoinedValue,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    EQ,
    NE,
    LT,
    LE,
    GT,
    GE,
    /// Equality where NULL equals NULL
    EQ2V,
    /// Inequality where NULL equals NULL
    NE2V,
    /// String concatenation
    Concat,
}

impl BinaryOp {
    /// Comparison operators produce booleans
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::EQ
                | BinaryOp::NE
                | BinaryOp::LT
                | BinaryOp::LE
                | BinaryOp::GT
                | BinaryOp::GE
                | BinaryOp::EQ2V
                | BinaryOp::NE2V
        )
    }

    /// AND / OR
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Operator text
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add | BinaryOp::Concat => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::EQ | BinaryOp::EQ2V => "=",
            BinaryOp::NE | BinaryOp::NE2V => "<>",
            BinaryOp::LT => "<",
            BinaryOp::LE => "<=",
            BinaryOp::GT => ">",
            BinaryOp::GE => ">=",
        }
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    Count,
    LongCount,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateFunc {
    /// SQL function name
    pub fn sql_name(self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::LongCount => "COUNT_BIG",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
            AggregateFunc::Avg => "AVG",
        }
    }

    /// Count forms
    pub fn is_count(self) -> bool {
        matches!(self, AggregateFunc::Count | AggregateFunc::LongCount)
    }
}

/// How a nested select composes into an expression position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubSelectKind {
    /// Single scalar value
    Scalar,
    /// Single row, possibly structured
    Element,
    /// Collection of rows
    Multiset,
    /// `EXISTS(...)`
    Exists,
}

/// Whether a select's ORDER BY is semantically meaningful
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderingType {
    #[default]
    Default,
    /// A set operator was applied; input order no longer holds
    Blocked,
    /// Order is never observed (EXISTS, aggregates)
    Never,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderKind {
    Ascending,
    Descending,
}

/// One ORDER BY entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderExpr {
    pub kind: OrderKind,
    pub expr: NodeId,
}

/// One arm of a CASE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct When {
    /// Condition (searched case) or match value (simple case)
    pub test: NodeId,
    pub value: NodeId,
}

/// One arm of an inheritance dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct TypeWhen {
    /// Discriminator value; `None` marks the default arm
    pub code: Option<Value>,
    pub type_name: TypeName,
    /// Entity construction for this type
    pub binding: NodeId,
}

/// Identity of a deferred association for the link cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey {
    /// Alias the link was read from
    pub alias: NodeId,
    pub member: MemberName,
}

/// The central statement node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectNode {
    /// Host-side result shape
    pub selection: Option<NodeId>,
    pub from: Option<NodeId>,
    pub where_: Option<NodeId>,
    pub group_by: Vec<NodeId>,
    pub having: Option<NodeId>,
    pub order_by: Vec<OrderExpr>,
    pub top: Option<NodeId>,
    pub distinct: bool,
    pub ordering: OrderingType,
    /// Output columns, each a `Column` owned by this select
    pub row: Vec<NodeId>,
    /// Statement is computed but not emitted
    pub do_not_output: bool,
}

impl SelectNode {
    /// A select with the given selection and source
    pub fn new(selection: NodeId, from: Option<NodeId>) -> Self {
        Self {
            selection: Some(selection),
            from,
            ..Self::default()
        }
    }

    /// Nothing but a projection over a source
    pub fn is_projection_only(&self) -> bool {
        self.where_.is_none()
            && self.group_by.is_empty()
            && self.having.is_none()
            && self.order_by.is_empty()
            && self.top.is_none()
            && !self.distinct
    }
}

/// Node variants
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // sources
    Table {
        row_type: TypeName,
        name: String,
        /// Columns created so far (back-references)
        columns: Vec<NodeId>,
    },
    TableValuedFunction {
        function: String,
        db_name: String,
        row_type: TypeName,
        args: Vec<NodeId>,
        columns: Vec<NodeId>,
    },
    Alias {
        node: NodeId,
    },
    Join {
        kind: JoinKind,
        left: NodeId,
        right: NodeId,
        condition: Option<NodeId>,
    },
    Union {
        left: NodeId,
        right: NodeId,
        all: bool,
    },
    Select(Box<SelectNode>),

    // columns and references
    Column {
        name: Option<String>,
        /// Owning select or table
        owner: Option<NodeId>,
        expr: Option<NodeId>,
        /// Mapped member backing a table column
        member: Option<MemberName>,
    },
    ColumnRef {
        column: NodeId,
    },
    AliasRef {
        alias: NodeId,
    },
    Member {
        target: NodeId,
        member: MemberName,
    },

    // scalar expressions
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Value {
        value: Value,
        /// Supplied by the caller (eligible for parameterization)
        client: bool,
    },
    Parameter {
        name: String,
        value: Option<Value>,
        /// Parent row column feeding a child query parameter
        outer: Option<NodeId>,
    },
    /// Raw keyword or variable text such as `@@ROWCOUNT` or `day`
    Variable {
        name: String,
    },
    Function {
        name: String,
        args: Vec<NodeId>,
    },
    Aggregate {
        func: AggregateFunc,
        arg: Option<NodeId>,
    },
    RowNumber {
        order_by: Vec<OrderExpr>,
    },
    Like {
        expr: NodeId,
        pattern: NodeId,
        escape: Option<NodeId>,
    },
    Between {
        expr: NodeId,
        low: NodeId,
        high: NodeId,
    },
    In {
        expr: NodeId,
        values: Vec<NodeId>,
    },
    SearchedCase {
        whens: Vec<When>,
        else_: NodeId,
    },
    SimpleCase {
        discriminator: NodeId,
        whens: Vec<When>,
        else_: Option<NodeId>,
    },
    /// A case over structured values, evaluated on the client
    ClientCase {
        discriminator: NodeId,
        whens: Vec<When>,
        else_: Option<NodeId>,
    },
    TypeCase {
        discriminator: NodeId,
        whens: Vec<TypeWhen>,
    },

    // shapes and deferred nodes
    New {
        members: Vec<(MemberName, NodeId)>,
    },
    Grouping {
        key: NodeId,
        group: NodeId,
    },
    Link {
        owner: TypeName,
        member: MemberName,
        keys: Vec<NodeId>,
        expansion: Option<NodeId>,
        key: LinkKey,
    },
    OptionalValue {
        has_value: NodeId,
        value: NodeId,
    },
    Shared {
        expr: NodeId,
    },
    SharedRef {
        shared: NodeId,
    },
    Simple {
        expr: NodeId,
    },
    SubSelect {
        kind: SubSelectKind,
        select: NodeId,
    },
    MethodCall {
        declaring: Declaring,
        method: String,
        target: Option<NodeId>,
        args: Vec<NodeId>,
    },

    // statements
    Insert {
        table: NodeId,
        bindings: Vec<NodeId>,
        /// Generated key captured through OUTPUT
        output_key: Option<NodeId>,
        /// Captured key is assigned to `@id` instead of selected
        output_to_local: bool,
    },
    Update {
        select: NodeId,
        assignments: Vec<NodeId>,
    },
    Delete {
        select: NodeId,
    },
    Assign {
        column: NodeId,
        value: NodeId,
    },
    Block {
        statements: Vec<NodeId>,
    },
    Exec {
        function: String,
        args: Vec<NodeId>,
    },
}

impl NodeKind {
    /// Short label used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Table { .. } => "Table",
            NodeKind::TableValuedFunction { .. } => "TableValuedFunction",
            NodeKind::Alias { .. } => "Alias",
            NodeKind::Join { .. } => "Join",
            NodeKind::Union { .. } => "Union",
            NodeKind::Select(_) => "Select",
            NodeKind::Column { .. } => "Column",
            NodeKind::ColumnRef { .. } => "ColumnRef",
            NodeKind::AliasRef { .. } => "AliasRef",
            NodeKind::Member { .. } => "Member",
            NodeKind::Unary { .. } => "Unary",
            NodeKind::Binary { .. } => "Binary",
            NodeKind::Value { .. } => "Value",
            NodeKind::Parameter { .. } => "Parameter",
            NodeKind::Variable { .. } => "Variable",
            NodeKind::Function { .. } => "FunctionCall",
            NodeKind::Aggregate { .. } => "Aggregate",
            NodeKind::RowNumber { .. } => "RowNumber",
            NodeKind::Like { .. } => "Like",
            NodeKind::Between { .. } => "Between",
            NodeKind::In { .. } => "In",
            NodeKind::SearchedCase { .. } => "SearchedCase",
            NodeKind::SimpleCase { .. } => "SimpleCase",
            NodeKind::ClientCase { .. } => "ClientCase",
            NodeKind::TypeCase { .. } => "TypeCase",
            NodeKind::New { .. } => "New",
            NodeKind::Grouping { .. } => "Grouping",
            NodeKind::Link { .. } => "Link",
            NodeKind::OptionalValue { .. } => "OptionalValue",
            NodeKind::Shared { .. } => "SharedExpression",
            NodeKind::SharedRef { .. } => "SharedExpressionRef",
            NodeKind::Simple { .. } => "SimpleExpression",
            NodeKind::SubSelect { kind, .. } => match kind {
                SubSelectKind::Scalar => "ScalarSubSelect",
                SubSelectKind::Element => "Element",
                SubSelectKind::Multiset => "Multiset",
                SubSelectKind::Exists => "Exists",
            },
            NodeKind::MethodCall { .. } => "MethodCall",
            NodeKind::Insert { .. } => "Insert",
            NodeKind::Update { .. } => "Update",
            NodeKind::Delete { .. } => "Delete",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::Block { .. } => "Block",
            NodeKind::Exec { .. } => "Exec",
        }
    }

    /// Owned child slots, in evaluation order
    pub fn children_mut(&mut self) -> Vec<&mut NodeId> {
        let mut out: Vec<&mut NodeId> = Vec::new();
        match self {
            NodeKind::Table { .. }
            | NodeKind::ColumnRef { .. }
            | NodeKind::AliasRef { .. }
            | NodeKind::SharedRef { .. }
            | NodeKind::Value { .. }
            | NodeKind::Parameter { .. }
            | NodeKind::Variable { .. } => {}
            NodeKind::TableValuedFunction { args, .. }
            | NodeKind::Function { args, .. }
            | NodeKind::Exec { args, .. } => out.extend(args.iter_mut()),
            NodeKind::Alias { node } => out.push(node),
            NodeKind::Join {
                left,
                right,
                condition,
                ..
            } => {
                out.push(left);
                out.push(right);
                out.extend(condition.iter_mut());
            }
            NodeKind::Union { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::Select(sel) => {
                let SelectNode {
                    selection,
                    from,
                    where_,
                    group_by,
                    having,
                    order_by,
                    top,
                    row,
                    ..
                } = sel.as_mut();
                out.extend(from.iter_mut());
                out.extend(row.iter_mut());
                out.extend(selection.iter_mut());
                out.extend(where_.iter_mut());
                out.extend(group_by.iter_mut());
                out.extend(having.iter_mut());
                out.extend(order_by.iter_mut().map(|o| &mut o.expr));
                out.extend(top.iter_mut());
            }
            NodeKind::Column { expr, .. } => out.extend(expr.iter_mut()),
            NodeKind::Member { target, .. } => out.push(target),
            NodeKind::Unary { operand, .. } => out.push(operand),
            NodeKind::Binary { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::Aggregate { arg, .. } => out.extend(arg.iter_mut()),
            NodeKind::RowNumber { order_by } => {
                out.extend(order_by.iter_mut().map(|o| &mut o.expr))
            }
            NodeKind::Like {
                expr,
                pattern,
                escape,
            } => {
                out.push(expr);
                out.push(pattern);
                out.extend(escape.iter_mut());
            }
            NodeKind::Between { expr, low, high } => {
                out.push(expr);
                out.push(low);
                out.push(high);
            }
            NodeKind::In { expr, values } => {
                out.push(expr);
                out.extend(values.iter_mut());
            }
            NodeKind::SearchedCase { whens, else_ } => {
                for w in whens.iter_mut() {
                    out.push(&mut w.test);
                    out.push(&mut w.value);
                }
                out.push(else_);
            }
            NodeKind::SimpleCase {
                discriminator,
                whens,
                else_,
            }
            | NodeKind::ClientCase {
                discriminator,
                whens,
                else_,
            } => {
                out.push(discriminator);
                for w in whens.iter_mut() {
                    out.push(&mut w.test);
                    out.push(&mut w.value);
                }
                out.extend(else_.iter_mut());
            }
            NodeKind::TypeCase {
                discriminator,
                whens,
            } => {
                out.push(discriminator);
                out.extend(whens.iter_mut().map(|w| &mut w.binding));
            }
            NodeKind::New { members } => out.extend(members.iter_mut().map(|(_, e)| e)),
            NodeKind::Grouping { key, group } => {
                out.push(key);
                out.push(group);
            }
            NodeKind::Link {
                keys, expansion, ..
            } => {
                out.extend(keys.iter_mut());
                out.extend(expansion.iter_mut());
            }
            NodeKind::OptionalValue { has_value, value } => {
                out.push(has_value);
                out.push(value);
            }
            NodeKind::Shared { expr } | NodeKind::Simple { expr } => out.push(expr),
            NodeKind::SubSelect { select, .. } => out.push(select),
            NodeKind::MethodCall { target, args, .. } => {
                out.extend(target.iter_mut());
                out.extend(args.iter_mut());
            }
            NodeKind::Insert {
                table, bindings, ..
            } => {
                out.push(table);
                out.extend(bindings.iter_mut());
            }
            NodeKind::Update {
                select,
                assignments,
            } => {
                out.push(select);
                out.extend(assignments.iter_mut());
            }
            NodeKind::Delete { select } => out.push(select),
            NodeKind::Assign { column, value } => {
                out.push(column);
                out.push(value);
            }
            NodeKind::Block { statements } => out.extend(statements.iter_mut()),
        }
        out
    }

    /// Back-reference slots
    pub fn refs_mut(&mut self) -> Vec<&mut NodeId> {
        let mut out: Vec<&mut NodeId> = Vec::new();
        match self {
            NodeKind::Table { columns, .. } | NodeKind::TableValuedFunction { columns, .. } => {
                out.extend(columns.iter_mut())
            }
            NodeKind::Column { owner, .. } => out.extend(owner.iter_mut()),
            NodeKind::ColumnRef { column } => out.push(column),
            NodeKind::AliasRef { alias } => out.push(alias),
            NodeKind::SharedRef { shared } => out.push(shared),
            NodeKind::Link { key, .. } => out.push(&mut key.alias),
            NodeKind::Parameter { outer, .. } => out.extend(outer.iter_mut()),
            NodeKind::Insert { output_key, .. } => out.extend(output_key.iter_mut()),
            _ => {}
        }
        out
    }

    /// Owned children as values
    pub fn children(&self) -> Vec<NodeId> {
        let mut copy = self.clone();
        copy.children_mut().into_iter().map(|id| *id).collect()
    }
}

/// A node with its host type, optional storage type and source description
#[derive(Debug, Clone, PartialEq)]
pub struct SqlNode {
    pub kind: NodeKind,
    pub ty: ValueType,
    pub provider: Option<ProviderType>,
    /// Description of the query construct this node came from
    pub origin: Option<Arc<str>>,
}

/// The node arena for one compilation
#[derive(Debug, Clone, Default)]
pub struct Ir {
    nodes: Vec<SqlNode>,
    origin: Option<Arc<str>>,
}

impl Ir {
    /// Empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever allocated
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a node stamped with the current origin
    pub fn add(&mut self, kind: NodeKind, ty: ValueType) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SqlNode {
            kind,
            ty,
            provider: None,
            origin: self.origin.clone(),
        });
        id
    }

    /// Replace the origin stamped onto new nodes, returning the previous one
    pub fn set_origin(&mut self, origin: Option<Arc<str>>) -> Option<Arc<str>> {
        std::mem::replace(&mut self.origin, origin)
    }

    pub fn node(&self, id: NodeId) -> &SqlNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SqlNode {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn ty(&self, id: NodeId) -> &ValueType {
        &self.nodes[id.index()].ty
    }

    /// Select payload, if `id` is a select
    pub fn select(&self, id: NodeId) -> Option<&SelectNode> {
        match self.kind(id) {
            NodeKind::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn select_mut(&mut self, id: NodeId) -> Option<&mut SelectNode> {
        match self.kind_mut(id) {
            NodeKind::Select(s) => Some(s),
            _ => None,
        }
    }

    /// Node behind an alias
    pub fn alias_node(&self, alias: NodeId) -> Option<NodeId> {
        match self.kind(alias) {
            NodeKind::Alias { node } => Some(*node),
            _ => None,
        }
    }

    /// Owned children of a node
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Every node of the subtree rooted at `root`, pre-order
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut kids = self.children(id);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Map from each aliased source to the alias naming it
    ///
    /// Selects, tables and table-valued functions map to their alias. The
    /// left-most leg of an aliased union also maps to the union's alias,
    /// since columns of a union are named by its first leg.
    pub fn alias_owner_map(&self, root: NodeId) -> HashMap<NodeId, NodeId> {
        let mut map = HashMap::new();
        for id in self.subtree(root) {
            if let NodeKind::Alias { node } = self.kind(id) {
                map.insert(*node, id);
                let mut leg = *node;
                while let NodeKind::Union { left, .. } = self.kind(leg) {
                    leg = *left;
                    map.insert(leg, id);
                }
            }
        }
        map
    }

    /// Column behind a (chain of) column reference(s)
    pub fn column_of(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::ColumnRef { column } => Some(*column),
            NodeKind::Column { .. } => Some(id),
            _ => None,
        }
    }

    /// Owner (select or table) of a column
    pub fn column_owner(&self, column: NodeId) -> Option<NodeId> {
        match self.kind(column) {
            NodeKind::Column { owner, .. } => *owner,
            _ => None,
        }
    }

    /// Literal payload, if `id` is a value
    pub fn as_value(&self, id: NodeId) -> Option<&Value> {
        match self.kind(id) {
            NodeKind::Value { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Boolean literal payload
    pub fn as_bool(&self, id: NodeId) -> Option<bool> {
        self.as_value(id).and_then(Value::as_bool)
    }

    /// Rewrite every owned child of `id` with `f`
    pub fn map_children<E>(
        &mut self,
        id: NodeId,
        mut f: impl FnMut(&mut Ir, NodeId) -> Result<NodeId, E>,
    ) -> Result<(), E> {
        let kids = self.children(id);
        let mut mapped = Vec::with_capacity(kids.len());
        for kid in kids {
            mapped.push(f(self, kid)?);
        }
        let mut kind = self.kind(id).clone();
        for (slot, new) in kind.children_mut().into_iter().zip(mapped) {
            *slot = new;
        }
        self.node_mut(id).kind = kind;
        Ok(())
    }

    /// Replace every reference to `from` inside the subtree of `root`
    pub fn replace_refs(&mut self, root: NodeId, from: NodeId, to: NodeId) {
        for id in self.subtree(root) {
            for slot in self.kind_mut(id).refs_mut() {
                if *slot == from {
                    *slot = to;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "ir_test.rs"]
mod tests;
