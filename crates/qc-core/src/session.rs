//! The session collaborator
//!
//! A session owns the data context a query is compiled for. The compiler
//! asks it for the context identity, named queryables, the modified-member
//! diff of an update target and per-association subquery filters.

use crate::names::{MemberName, TypeName};
use crate::query::QueryExpr;
use crate::value::ObjectValue;
use std::collections::BTreeMap;

/// Services the compiler consumes from the surrounding session
pub trait Session {
    /// Identity of the data context, compared against `context` tags in the
    /// query tree
    fn context_id(&self) -> Option<&str>;

    /// Expansion of a named queryable
    fn resolve_queryable(&self, name: &str) -> Option<&QueryExpr>;

    /// Members of `item` whose current value differs from the original
    ///
    /// Without an original snapshot every supplied member counts as
    /// modified.
    fn modified_members(&self, item: &ObjectValue) -> Vec<MemberName> {
        match &item.original {
            None => item.fields.keys().cloned().collect(),
            Some(original) => item
                .fields
                .iter()
                .filter(|(k, v)| original.get(k.as_str()) != Some(*v))
                .map(|(k, _)| k.clone())
                .collect(),
        }
    }

    /// Filter lambda `(other) => bool` applied when expanding an association
    fn association_filter(&self, owner: &TypeName, association: &MemberName) -> Option<&QueryExpr>;
}

/// A session with fixed contents, built up front
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    context_id: Option<String>,
    queryables: BTreeMap<String, QueryExpr>,
    filters: BTreeMap<(TypeName, MemberName), QueryExpr>,
}

impl StaticSession {
    /// Empty session with no context identity
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the context identity
    pub fn with_context(mut self, id: impl Into<String>) -> Self {
        self.context_id = Some(id.into());
        self
    }

    /// Register a named queryable
    pub fn with_queryable(mut self, name: impl Into<String>, expr: QueryExpr) -> Self {
        self.queryables.insert(name.into(), expr);
        self
    }

    /// Register an association filter lambda
    pub fn with_association_filter(
        mut self,
        owner: impl Into<String>,
        association: impl Into<String>,
        filter: QueryExpr,
    ) -> Self {
        self.filters.insert(
            (TypeName::new(owner), MemberName::new(association)),
            filter,
        );
        self
    }
}

impl Session for StaticSession {
    fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    fn resolve_queryable(&self, name: &str) -> Option<&QueryExpr> {
        self.queryables.get(name)
    }

    fn association_filter(&self, owner: &TypeName, association: &MemberName) -> Option<&QueryExpr> {
        self.filters.get(&(owner.clone(), association.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::build;
    use crate::value::Value;

    fn order(city: &str, original_city: Option<&str>) -> ObjectValue {
        let fields = BTreeMap::from([
            (MemberName::new("OrderID"), Value::Int(7)),
            (MemberName::new("ShipCity"), Value::String(city.into())),
        ]);
        let original = original_city.map(|c| {
            BTreeMap::from([
                (MemberName::new("OrderID"), Value::Int(7)),
                (MemberName::new("ShipCity"), Value::String(c.into())),
            ])
        });
        ObjectValue {
            type_name: TypeName::new("Order"),
            fields,
            original,
        }
    }

    #[test]
    fn test_modified_members_diff() {
        let s = StaticSession::new();
        assert_eq!(
            s.modified_members(&order("Oslo", Some("Bergen"))),
            vec![MemberName::new("ShipCity")]
        );
        assert!(s.modified_members(&order("Oslo", Some("Oslo"))).is_empty());
    }

    #[test]
    fn test_modified_members_without_original() {
        let s = StaticSession::new();
        assert_eq!(s.modified_members(&order("Oslo", None)).len(), 2);
    }

    #[test]
    fn test_lookups() {
        let s = StaticSession::new()
            .with_context("ctx-1")
            .with_queryable("AllOrders", build::table("Order"))
            .with_association_filter("Customer", "Orders", build::boolean(true));
        assert_eq!(s.context_id(), Some("ctx-1"));
        assert!(s.resolve_queryable("AllOrders").is_some());
        assert!(s
            .association_filter(&TypeName::new("Customer"), &MemberName::new("Orders"))
            .is_some());
        assert!(s.resolve_queryable("Missing").is_none());
    }
}
