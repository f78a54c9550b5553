//! Shared test utilities for qc-compiler
//!
//! Builds compilations over the `northwind` fixture mapping and offers
//! shorthands for the query trees tests write by hand.

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::context::CompileContext;
use crate::error::CompileResult;
use crate::ir::{Ir, NodeId};
use crate::lowering::lower_query;
use qc_core::query::build;
use qc_core::test_utils::northwind;
use qc_core::{
    BinaryOperator, CompilerConfig, LiteralMode, MappingModel, ProviderMode, QueryExpr,
    ScalarKind, SkipStrategy, StaticSession, ValueType,
};
use qc_sql::SqlServerTypeProvider;

/// Everything a compilation borrows, owned in one place
pub struct TestEnv {
    pub model: MappingModel,
    pub session: StaticSession,
    pub types: SqlServerTypeProvider,
    pub config: CompilerConfig,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    /// Northwind mapping, empty session, SQL Server 2008 defaults
    pub fn new() -> Self {
        Self {
            model: northwind(),
            session: StaticSession::new(),
            types: SqlServerTypeProvider::new(),
            config: CompilerConfig::for_provider(ProviderMode::Sql2008),
        }
    }

    /// Switch the target provider
    pub fn provider(mut self, provider: ProviderMode) -> Self {
        self.config.provider = provider;
        self
    }

    /// Use the NOT EXISTS skip strategy
    pub fn not_exists_skip(mut self) -> Self {
        self.config.strategy.skip_strategy = Some(SkipStrategy::NotExists);
        self
    }

    /// Emit CROSS JOIN + WHERE instead of ON clauses
    pub fn without_join_on(mut self) -> Self {
        self.config.strategy.can_use_join_on = Some(false);
        self
    }

    /// Keep correlated sub-selects instead of OUTER APPLY
    pub fn without_outer_apply(mut self) -> Self {
        self.config.strategy.can_use_outer_apply = Some(false);
        self
    }

    /// Render client literals as parameters
    pub fn parameterized(mut self) -> Self {
        self.config.literals = LiteralMode::Parameterize;
        self
    }

    /// Replace the session
    pub fn session(mut self, session: StaticSession) -> Self {
        self.session = session;
        self
    }

    pub fn context(&self) -> CompileContext<'_> {
        CompileContext::new(&self.model, &self.session, &self.types, &self.config)
    }

    pub fn compiler(&self) -> QueryCompiler<'_> {
        QueryCompiler::new(&self.model, &self.session, &self.types, &self.config)
    }

    pub fn compile(&self, query: &QueryExpr) -> CompileResult<CompiledQuery> {
        self.compiler().compile(query)
    }

    /// Rendered text of a query that must compile
    pub fn sql(&self, query: &QueryExpr) -> String {
        match self.compile(query) {
            Ok(compiled) => compiled.text(),
            Err(e) => panic!("compilation failed: {e}"),
        }
    }

    /// Lowered (unbound) IR of a query that must lower
    pub fn lower(&self, query: &QueryExpr) -> (Ir, NodeId) {
        let cx = self.context();
        let mut ir = Ir::new();
        match lower_query(&mut ir, &cx, query) {
            Ok(root) => (ir, root),
            Err(e) => panic!("lowering failed: {e}"),
        }
    }
}

pub fn order_ty() -> ValueType {
    ValueType::entity("Order")
}

pub fn customer_ty() -> ValueType {
    ValueType::entity("Customer")
}

pub fn orders() -> QueryExpr {
    build::table("Order")
}

pub fn customers() -> QueryExpr {
    build::table("Customer")
}

pub fn order_lines() -> QueryExpr {
    build::table("OrderLine")
}

pub fn people() -> QueryExpr {
    build::table("Person")
}

pub fn seq_of(ty: ValueType) -> ValueType {
    ValueType::sequence(ty)
}

/// `param.member` on an order parameter named `o`
pub fn o(member: &str, ty: ValueType) -> QueryExpr {
    build::member(build::param("o", order_ty()), member, ty)
}

/// `o => body` over orders
pub fn order_lambda(body: QueryExpr) -> QueryExpr {
    build::lambda("o", order_ty(), body)
}

/// `orders.Where(o => pred)`
pub fn orders_where(pred: QueryExpr) -> QueryExpr {
    build::seq("Where", vec![orders(), order_lambda(pred)], seq_of(order_ty()))
}

/// `orders.Select(o => body)`
pub fn orders_select(body: QueryExpr) -> QueryExpr {
    let ty = seq_of(body.ty());
    build::seq("Select", vec![orders(), order_lambda(body)], ty)
}

/// `left op right` as a boolean comparison
pub fn cmp(op: BinaryOperator, left: QueryExpr, right: QueryExpr) -> QueryExpr {
    build::compare(op, left, right)
}

pub fn int32() -> ValueType {
    ValueType::int32()
}

pub fn nullable_string() -> ValueType {
    ValueType::nullable(ScalarKind::String)
}
