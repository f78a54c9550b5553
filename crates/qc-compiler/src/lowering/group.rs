//! GroupBy lowering
//!
//! `seq.GroupBy(key, elem)` becomes
//!
//! ```text
//! SELECT GROUPING(key, MULTISET(SELECT elem FROM seq' AS d WHERE key == key(d)))
//! FROM (SELECT key FROM seq AS s GROUP BY key)
//! ```
//!
//! where `seq'` is a duplicate of the source. The select carrying the GROUP
//! BY is remembered so aggregates over the group can be pushed into it.

use super::Lowerer;
use crate::error::CompileResult;
use crate::ir::{BinaryOp, NodeId, NodeKind, SubSelectKind};
use qc_core::{MemberName, QueryExpr, ValueType};

/// The grouped select behind a grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GroupInfo {
    /// Select carrying the GROUP BY clause
    pub(crate) select_with_group: NodeId,
    /// Element expression evaluated against the ungrouped source
    pub(crate) element_on_group_source: NodeId,
}

impl Lowerer<'_, '_> {
    pub(crate) fn visit_group_by(&mut self, args: &[QueryExpr]) -> CompileResult<NodeId> {
        let key_lambda = &args[1];
        let (elem_lambda, result_lambda) = match args.len() {
            2 => (None, None),
            3 => match args[2].as_lambda() {
                Some((params, _)) if params.len() == 2 => (None, Some(&args[2])),
                _ => (Some(&args[2]), None),
            },
            _ => (Some(&args[2]), Some(&args[3])),
        };

        let seq = self.visit_sequence(&args[0])?;
        let seq = self.lock_select(seq);
        let (seq_alias, seq_ref) = self.alias_select(seq);
        let key = self.visit_lambda("GroupBy", key_lambda, &[seq_ref])?;

        // the same rows are scanned again to collect each group's members
        let dup = self.ir.duplicate(seq);
        let (dup_alias, dup_ref) = self.alias_select(dup);
        let key_dup = self.visit_lambda("GroupBy", key_lambda, &[dup_ref])?;

        let (elem, elem_on_source) = match elem_lambda {
            Some(e) => (
                self.visit_lambda("GroupBy", e, &[dup_ref])?,
                self.visit_lambda("GroupBy", e, &[seq_ref])?,
            ),
            None => (dup_ref, seq_ref),
        };

        let key_ty = self.ir.ty(key).clone();
        let (key_shared, key_ref) = self.ir.shared(key);

        let elem_select = self.ir.new_select(elem, Some(dup_alias));
        let matches = self.ir.binary(BinaryOp::EQ2V, key_ref, key_dup);
        if let Some(s) = self.ir.select_mut(elem_select) {
            s.where_ = Some(matches);
        }
        let group = self.ir.sub_select(SubSelectKind::Multiset, elem_select);

        let gsel_key = self.shared_ref(key_shared, &key_ty);
        let gsel = self.ir.new_select(gsel_key, Some(seq_alias));
        if let Some(s) = self.ir.select_mut(gsel) {
            s.group_by.push(key_shared);
        }
        let gsel_alias = self.ir.alias(gsel);

        let elem_ty = self.ir.ty(elem).clone();
        let grouping_key = self.shared_ref(key_shared, &key_ty);
        let grouping = self.ir.add(
            NodeKind::Grouping {
                key: grouping_key,
                group,
            },
            ValueType::grouping(key_ty.clone(), elem_ty),
        );
        let info = GroupInfo {
            select_with_group: gsel,
            element_on_group_source: elem_on_source,
        };
        self.gmap.insert(grouping, info);

        let Some(result_lambda) = result_lambda else {
            return Ok(self.ir.new_select(grouping, Some(gsel_alias)));
        };

        let kg_select = self.ir.new_select(grouping, Some(gsel_alias));
        let (kg_alias, kg_ref) = self.alias_select(kg_select);
        let kg_key_target = self.ir.alias_ref(kg_alias);
        let kg_key = self
            .ir
            .member(kg_key_target, &MemberName::new("Key"), key_ty);
        let body = self.visit_lambda("GroupBy", result_lambda, &[kg_key, kg_ref])?;
        let body = self.as_expression(body);
        // groupings constructed by the result selector are pulled up later
        self.gmap.insert(body, info);
        Ok(self.ir.new_select(body, Some(kg_alias)))
    }

    fn shared_ref(&mut self, shared: NodeId, ty: &ValueType) -> NodeId {
        self.ir.add(NodeKind::SharedRef { shared }, ty.clone())
    }

    /// Grouped select reachable from `source` through aliases and members
    pub(crate) fn find_group_info(&self, source: NodeId) -> Option<GroupInfo> {
        let mut current = source;
        loop {
            if let Some(info) = self.gmap.get(&current) {
                return Some(*info);
            }
            current = match self.ir.kind(current) {
                NodeKind::AliasRef { alias } => *alias,
                NodeKind::Alias { node } => match self.ir.select(*node) {
                    Some(select) => select.selection?,
                    None => *node,
                },
                NodeKind::Member { target, .. } => *target,
                _ => return None,
            };
        }
    }
}
