//! Insert, Update and Delete
//!
//! Data manipulation is only allowed as the outermost operator. The target
//! item is always a constant entity instance; an optional result selector
//! reads the affected row back in the same batch.

use super::{lambda_parts, Lowerer};
use crate::error::{CompileError, CompileResult};
use crate::ir::{BinaryOp, NodeId, NodeKind, UnaryOp};
use qc_core::{
    CoreError, IdentityRetrieval, MemberName, MetaDataMember, MetaModel, MetaType, ObjectValue,
    QueryExpr, ScalarKind, UnaryOperator, Value, ValueType,
};

impl<'a, 'c> Lowerer<'a, 'c> {
    pub(crate) fn visit_dml(
        &mut self,
        method: &str,
        args: &[QueryExpr],
        ty: &ValueType,
        outer: bool,
    ) -> CompileResult<NodeId> {
        if !outer {
            return Err(CompileError::unsupported(format!(
                "{method} inside a query"
            )));
        }
        let bad_arity = || CompileError::UnsupportedOverload {
            operator: method.to_string(),
            detail: format!("{} arguments", args.len()),
        };
        match (method, args.len()) {
            ("Insert", 1 | 2) => self.visit_insert(&args[0], args.get(1)),
            ("Update", 1) => self.visit_update(&args[0], None, None),
            ("Update", 2) => {
                let (_, body) = lambda_parts(method, &args[1], 1)?;
                if body.ty() == *ty {
                    self.visit_update(&args[0], Some(&args[1]), None)
                } else {
                    self.visit_update(&args[0], None, Some(&args[1]))
                }
            }
            ("Update", 3) => self.visit_update(&args[0], Some(&args[1]), Some(&args[2])),
            ("Delete", 1 | 2) => self.visit_delete(&args[0], args.get(1)),
            ("Insert" | "Update" | "Delete", _) => Err(bad_arity()),
            _ => Err(CompileError::UnsupportedMethod {
                declaring: "DataManipulation".to_string(),
                method: method.to_string(),
            }),
        }
    }

    /// The constant entity a statement targets, with its mapping
    fn dml_item<'m>(
        &self,
        operator: &str,
        item: &'m QueryExpr,
    ) -> CompileResult<(&'m ObjectValue, &'c MetaType)> {
        let Some(Value::Object(obj)) = item.as_constant() else {
            return Err(CompileError::ConstantRequired {
                operator: operator.to_string(),
                found: item.kind_name().to_string(),
            });
        };
        let model: &'c dyn MetaModel = self.cx.model;
        let meta = model
            .meta_type(&obj.type_name)
            .ok_or_else(|| CoreError::UnmappedType {
                type_name: obj.type_name.to_string(),
            })?;
        Ok((obj, meta))
    }

    fn visit_insert(
        &mut self,
        item: &QueryExpr,
        result_selector: Option<&QueryExpr>,
    ) -> CompileResult<NodeId> {
        let (obj, meta) = self.dml_item("Insert", item)?;
        let table = self.table_node(&obj.type_name)?;

        let mut bindings = Vec::new();
        for member in meta
            .members
            .iter()
            .filter(|m| !m.db_generated && !m.version)
        {
            let mut value = obj.field(member.name.as_str());
            // a missing discriminator is the type's own code
            if member.discriminator && value.is_null() {
                if let Some(code) = &meta.inheritance_code {
                    value = code.clone();
                }
            }
            let column = self.member_column(table, member)?;
            let value = self.member_value(member, value)?;
            bindings.push(self.assign(column, value));
        }
        let insert = self.ir.add(
            NodeKind::Insert {
                table,
                bindings,
                output_key: None,
                output_to_local: false,
            },
            ValueType::Unit,
        );
        let Some(result_selector) = result_selector else {
            return Ok(insert);
        };

        let (params, body) = lambda_parts("Insert", result_selector, 1)?;
        let identity = meta
            .members
            .iter()
            .find(|m| m.primary_key && m.db_generated);
        let key_only =
            identity.is_some_and(|id| is_member_of_param(body, &params[0].name, &id.name));

        let mut output_key = false;
        if let Some(id) = identity {
            if id.ty.scalar_kind() == Some(ScalarKind::Guid)
                && self.cx.strategy.can_output_from_insert
            {
                let column = self.member_column(table, id)?;
                if let NodeKind::Insert {
                    output_key: key,
                    output_to_local,
                    ..
                } = self.ir.kind_mut(insert)
                {
                    *key = Some(column);
                    *output_to_local = !key_only;
                }
                output_key = true;
            }
        }

        // the result is read back from a second scan of the table
        let read_back = self.table_node(&obj.type_name)?;
        let (alias, aref) = self.alias_select(read_back);
        let projection = self.visit_lambda("Insert", result_selector, &[aref])?;
        let projection = self.as_expression(projection);
        let pred = match identity {
            Some(id) => {
                let target = self.ir.duplicate(aref);
                let key = self.ir.member(target, &id.name, id.ty.clone());
                let generated = self.identity_expression(id, output_key)?;
                self.ir.binary(BinaryOp::EQ, key, generated)
            }
            None => {
                let target = self.ir.duplicate(aref);
                let value = self.visit_constant(&Value::Object(obj.clone()), &item.ty());
                self.ir.binary(BinaryOp::EQ2V, target, value)
            }
        };
        let result = self.ir.new_select(projection, Some(alias));
        if let Some(s) = self.ir.select_mut(result) {
            s.where_ = Some(pred);
        }

        let mut statements = vec![insert];
        if let (Some(id), true) = (identity, key_only) {
            // a lone generated key is returned without touching the table
            if !output_key {
                let mut generated = self.identity_expression(id, false)?;
                if self.ir.ty(generated) != &id.ty {
                    generated = self.ir.unary_typed(UnaryOp::Convert, generated, id.ty.clone());
                    self.ir.node_mut(generated).provider = self.cx.member_provider(id)?;
                }
                statements.push(self.ir.new_select(generated, None));
            }
            if let Some(s) = self.ir.select_mut(result) {
                s.do_not_output = true;
            }
        }
        statements.push(result);
        Ok(self.block(statements))
    }

    fn visit_update(
        &mut self,
        item: &QueryExpr,
        result_selector: Option<&QueryExpr>,
        check: Option<&QueryExpr>,
    ) -> CompileResult<NodeId> {
        let (obj, meta) = self.dml_item("Update", item)?;
        let target = self.match_item(obj, &item.ty(), check, "Update")?;
        let row = self.selection(target)?;

        let modified = self.cx.session.modified_members(obj);
        if modified.is_empty() {
            return Err(CompileError::unsupported("an update with no modified members"));
        }
        let mut assignments = Vec::with_capacity(modified.len());
        for name in modified {
            let member = meta
                .member(name.as_str())
                .ok_or_else(|| CompileError::UnresolvedMember {
                    member: name.to_string(),
                    target: obj.type_name.to_string(),
                })?;
            let row_ref = self.ir.duplicate(row);
            let column = self.ir.member(row_ref, &member.name, member.ty.clone());
            let value = self.member_value(member, obj.field(name.as_str()))?;
            assignments.push(self.assign(column, value));
        }
        let update = self.ir.add(
            NodeKind::Update {
                select: target,
                assignments,
            },
            ValueType::Unit,
        );
        let Some(result_selector) = result_selector else {
            return Ok(update);
        };

        let source = self.match_item(obj, &item.ty(), None, "Update")?;
        let (alias, aref) = self.alias_select(source);
        let projection = self.visit_lambda("Update", result_selector, &[aref])?;
        let projection = self.as_expression(projection);
        let result = self.project(alias, projection)?;

        let row_count = if self.cx.strategy.can_use_row_status {
            "@@ROWCOUNT"
        } else {
            "@ROWCOUNT"
        };
        let row_count = self.ir.variable(row_count, ValueType::int32());
        let zero = self.ir.int_lit(0);
        let affected = self.ir.binary(BinaryOp::GT, row_count, zero);
        let existing = self.ir.select(result).and_then(|s| s.where_);
        let pred = self.ir.and_opt(Some(affected), existing);
        if let Some(s) = self.ir.select_mut(result) {
            s.where_ = pred;
        }
        Ok(self.block(vec![update, result]))
    }

    fn visit_delete(
        &mut self,
        item: &QueryExpr,
        check: Option<&QueryExpr>,
    ) -> CompileResult<NodeId> {
        let (obj, _) = self.dml_item("Delete", item)?;
        let target = self.match_item(obj, &item.ty(), check, "Delete")?;
        Ok(self.ir.add(NodeKind::Delete { select: target }, ValueType::Unit))
    }

    /// `SELECT t FROM table AS t WHERE t == item [AND check(t)]`
    fn match_item(
        &mut self,
        obj: &ObjectValue,
        item_ty: &ValueType,
        check: Option<&QueryExpr>,
        operator: &str,
    ) -> CompileResult<NodeId> {
        let select = self.visit_table(&obj.type_name, None)?;
        let row = self.selection(select)?;
        let target = self.ir.duplicate(row);
        let value = self.visit_constant(&Value::Object(obj.clone()), item_ty);
        let same = self.ir.binary(BinaryOp::EQ, target, value);
        let check = match check {
            Some(check) => Some(self.visit_lambda(operator, check, &[row])?),
            None => None,
        };
        let pred = self.ir.and_opt(Some(same), check);
        if let Some(s) = self.ir.select_mut(select) {
            s.where_ = pred;
        }
        Ok(select)
    }

    /// Value that reads back the key generated by the last insert
    fn identity_expression(
        &mut self,
        id: &MetaDataMember,
        from_output: bool,
    ) -> CompileResult<NodeId> {
        let provider = self.cx.member_provider(id)?;
        if from_output {
            let var = self.ir.variable("@id", id.ty.clone());
            self.ir.node_mut(var).provider = provider;
            return Ok(var);
        }
        if let Some(pt) = provider {
            if !pt.is_integral() && !pt.is_exact_numeric() {
                return Err(CompileError::InvalidDbGeneratedType {
                    member: id.name.to_string(),
                    db_type: pt.to_query_string(),
                });
            }
        }
        let name = match self.cx.strategy.identity_retrieval {
            IdentityRetrieval::ScopeIdentity => "SCOPE_IDENTITY()",
            IdentityRetrieval::GlobalIdentity => "@@IDENTITY",
        };
        let decimal = ValueType::scalar(ScalarKind::Decimal);
        let var = self.ir.variable(name, decimal.clone());
        self.ir.node_mut(var).provider = self.cx.provider_type(&decimal);
        Ok(var)
    }

    fn member_column(&mut self, table: NodeId, member: &MetaDataMember) -> CompileResult<NodeId> {
        let provider = self.cx.member_provider(member)?;
        Ok(self.ir.table_column(
            table,
            &member.name,
            member.column_name(),
            member.ty.clone(),
            provider,
        ))
    }

    fn member_value(&mut self, member: &MetaDataMember, value: Value) -> CompileResult<NodeId> {
        let node = self.ir.client_value(value, member.ty.clone());
        self.ir.node_mut(node).provider = self.cx.member_provider(member)?;
        Ok(node)
    }

    fn assign(&mut self, column: NodeId, value: NodeId) -> NodeId {
        self.ir.add(NodeKind::Assign { column, value }, ValueType::Unit)
    }

    fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        let ty = statements
            .last()
            .map(|&s| self.ir.ty(s).clone())
            .unwrap_or(ValueType::Unit);
        self.ir.add(NodeKind::Block { statements }, ty)
    }
}

/// `p => p.Id` (possibly boxed through a conversion)
fn is_member_of_param(body: &QueryExpr, param: &str, member: &MemberName) -> bool {
    match body.unquote() {
        QueryExpr::Unary {
            op: UnaryOperator::Convert,
            operand,
            ..
        } => is_member_of_param(operand, param, member),
        QueryExpr::Member {
            target, member: m, ..
        } => m == member && matches!(&**target, QueryExpr::Parameter { name, .. } if name == param),
        _ => false,
    }
}
