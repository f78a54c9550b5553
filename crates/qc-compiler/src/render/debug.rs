//! Diagnostic notation for nodes without a SQL form

use super::Renderer;
use crate::error::CompileResult;
use crate::ir::{NodeId, NodeKind};

impl Renderer<'_, '_> {
    pub(super) fn debug_node(&mut self, id: NodeId) -> CompileResult<()> {
        let ir = self.ir;
        match ir.kind(id) {
            NodeKind::AliasRef { alias } => {
                let name = self.names.alias(*alias);
                self.push(&format!("AREF({name})"));
            }
            NodeKind::Member { target, member } => {
                self.push("MEMBER(");
                self.expr(*target)?;
                self.push(&format!(".{member})"));
            }
            NodeKind::New { members } => {
                let ty = ir.ty(id).display_name();
                self.push(&format!("new {ty}("));
                for (i, (member, value)) in members.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(&format!("{member} = "));
                    self.expr(*value)?;
                }
                self.push(")");
            }
            NodeKind::Grouping { key, group } => {
                self.push("GROUPING(");
                self.expr(*key)?;
                self.push(", ");
                self.expr(*group)?;
                self.push(")");
            }
            NodeKind::Link {
                owner,
                member,
                expansion,
                ..
            } => {
                self.push(&format!("LINK({owner}.{member}"));
                if let Some(expansion) = expansion {
                    self.push(", ");
                    self.expr(*expansion)?;
                }
                self.push(")");
            }
            NodeKind::OptionalValue { has_value, value } => {
                self.push("OPTIONAL(");
                self.expr(*has_value)?;
                self.push(", ");
                self.expr(*value)?;
                self.push(")");
            }
            NodeKind::Shared { expr } | NodeKind::Simple { expr } => {
                self.push(&format!("{}(", ir.kind(id).name().to_uppercase()));
                self.expr(*expr)?;
                self.push(")");
            }
            NodeKind::SharedRef { shared } => {
                self.push(&format!("SHAREDREF({shared})"));
            }
            NodeKind::ClientCase {
                discriminator,
                whens,
                else_,
            } => {
                self.push("CLIENTCASE(");
                self.expr(*discriminator)?;
                for when in whens {
                    self.push(" WHEN ");
                    self.expr(when.test)?;
                    self.push(" THEN ");
                    self.expr(when.value)?;
                }
                if let Some(else_) = else_ {
                    self.push(" ELSE ");
                    self.expr(*else_)?;
                }
                self.push(")");
            }
            NodeKind::TypeCase {
                discriminator,
                whens,
            } => {
                self.push("TYPECASE(");
                self.expr(*discriminator)?;
                for when in whens {
                    match &when.code {
                        Some(code) => self.push(&format!(" WHEN {code} THEN ")),
                        None => self.push(" DEFAULT "),
                    }
                    self.expr(when.binding)?;
                }
                self.push(")");
            }
            NodeKind::SubSelect { select, .. } => {
                self.push(&ir.kind(id).name().to_uppercase());
                self.nested(*select)?;
            }
            NodeKind::MethodCall {
                declaring,
                method,
                target,
                args,
            } => {
                self.push(&format!("{declaring}.{method}("));
                if let Some(target) = target {
                    self.expr(*target)?;
                    if !args.is_empty() {
                        self.push("; ");
                    }
                }
                self.expr_list(args)?;
                self.push(")");
            }
            other => {
                self.push(&format!("<{}>", other.name()));
            }
        }
        Ok(())
    }
}
