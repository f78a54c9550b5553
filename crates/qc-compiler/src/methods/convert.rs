//! Conversions

use super::{Call, MethodLowerer};
use crate::error::CompileResult;
use crate::ir::NodeId;
use qc_core::{ScalarKind, ValueType};
use qc_sql::ProviderType;

fn conversion_target(method: &str) -> Option<ScalarKind> {
    let kind = match method {
        "ToBoolean" => ScalarKind::Bool,
        "ToByte" => ScalarKind::Byte,
        "ToChar" => ScalarKind::Char,
        "ToDateTime" => ScalarKind::DateTime,
        "ToDecimal" => ScalarKind::Decimal,
        "ToDouble" => ScalarKind::Double,
        "ToInt16" => ScalarKind::Int16,
        "ToInt32" => ScalarKind::Int32,
        "ToInt64" => ScalarKind::Int64,
        "ToSingle" => ScalarKind::Single,
        "ToString" => ScalarKind::String,
        _ => return None,
    };
    Some(kind)
}

impl<'a, 'c> MethodLowerer<'a, 'c> {
    /// `Convert.ToX(x)` and `Parse(s)`; the target is the call's type
    pub(super) fn convert_method(&mut self, call: &Call) -> CompileResult<NodeId> {
        let target = match conversion_target(&call.method) {
            Some(kind) => kind,
            None if call.method == "Parse" => match call.ty.scalar_kind() {
                Some(kind) => kind,
                None => return Err(call.form("Parse must produce a scalar")),
            },
            None => return Err(call.unsupported()),
        };
        let [x] = call.args()?;
        let source = self.ir.ty(x).scalar_kind();
        if source == Some(target) {
            return Ok(x);
        }
        if target == ScalarKind::String {
            return Ok(self.to_nvarchar(x));
        }
        let ty = if self.ir.ty(x).is_nullable() {
            ValueType::nullable(target)
        } else {
            ValueType::scalar(target)
        };
        let Some(provider) = self.cx.provider_type(&ty) else {
            return Err(call.form(format!("no storage type for {}", ty.display_name())));
        };
        Ok(self.convert(x, ty, provider))
    }

    /// `CONVERT(NVARCHAR(..), x)`
    pub(crate) fn to_nvarchar(&mut self, x: NodeId) -> NodeId {
        let ty = if self.ir.ty(x).is_nullable() {
            ValueType::nullable(ScalarKind::String)
        } else {
            ValueType::string()
        };
        self.convert(x, ty, ProviderType::nvarchar_default())
    }
}
