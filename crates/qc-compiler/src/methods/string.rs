//! String methods
//!
//! Character positions are zero-based on the host and one-based in SQL.

use super::{Call, MethodLowerer};
use crate::error::CompileResult;
use crate::ir::{BinaryOp, NodeId, NodeKind, UnaryOp, When};
use qc_core::{ScalarKind, Value, ValueType};
use qc_sql::dialect::LIKE_ESCAPE;
use qc_sql::escape_like;

/// Where the search text may sit inside the matched string
#[derive(Clone, Copy)]
enum Anchor {
    Anywhere,
    Start,
    End,
}

impl<'a, 'c> MethodLowerer<'a, 'c> {
    pub(super) fn string_method(&mut self, call: &Call) -> CompileResult<NodeId> {
        if call.target.is_none() {
            return self.string_static(call);
        }
        let x = call.this()?;
        let n = call.args.len();
        match call.method.as_str() {
            "Length" if n == 0 => Ok(self.len(x)),
            "Contains" if n == 1 => self.like_search(call, x, Anchor::Anywhere),
            "StartsWith" if n == 1 => self.like_search(call, x, Anchor::Start),
            "EndsWith" if n == 1 => self.like_search(call, x, Anchor::End),
            "IndexOf" if n == 1 || n == 2 => self.index_of(call, x),
            "Substring" if n == 1 || n == 2 => {
                let start = self.plus_one(call.args[0]);
                let count = match call.args.get(1) {
                    Some(&count) => count,
                    None => {
                        let whole = self.dup(x);
                        self.len(whole)
                    }
                };
                Ok(self.func("SUBSTRING", vec![x, start, count], call.ty.clone()))
            }
            "get_Chars" if n == 1 => {
                let start = self.plus_one(call.args[0]);
                let one = self.int(1);
                Ok(self.func("SUBSTRING", vec![x, start, one], call.ty.clone()))
            }
            "ToUpper" if n == 0 => Ok(self.func("UPPER", vec![x], call.ty.clone())),
            "ToLower" if n == 0 => Ok(self.func("LOWER", vec![x], call.ty.clone())),
            "Trim" if n == 0 => {
                let right = self.func("RTRIM", vec![x], call.ty.clone());
                Ok(self.func("LTRIM", vec![right], call.ty.clone()))
            }
            "TrimStart" if n == 0 => Ok(self.func("LTRIM", vec![x], call.ty.clone())),
            "TrimEnd" if n == 0 => Ok(self.func("RTRIM", vec![x], call.ty.clone())),
            "Replace" if n == 2 => {
                let (from, to) = (call.args[0], call.args[1]);
                Ok(self.func("REPLACE", vec![x, from, to], call.ty.clone()))
            }
            "Insert" if n == 2 => {
                let (at, s) = (call.args[0], call.args[1]);
                // STUFF cannot append at the very end
                let whole = self.dup(x);
                let len = self.len(whole);
                let at_copy = self.dup(at);
                let at_end = self.bin(BinaryOp::EQ, len, at_copy);
                let tail = self.dup(s);
                let appended = self.bin_typed(BinaryOp::Concat, x, tail, &call.ty);
                let target = self.dup(x);
                let start = self.plus_one(at);
                let zero = self.int(0);
                let stuffed = self.func("STUFF", vec![target, start, zero, s], call.ty.clone());
                Ok(self.iif(at_end, appended, stuffed))
            }
            "Remove" if n == 1 || n == 2 => {
                let start = self.plus_one(call.args[0]);
                let count = match call.args.get(1) {
                    Some(&count) => count,
                    None => {
                        let whole = self.dup(x);
                        self.len(whole)
                    }
                };
                let empty = self.string_lit("");
                Ok(self.func("STUFF", vec![x, start, count, empty], call.ty.clone()))
            }
            "PadLeft" if n == 1 || n == 2 => self.pad(call, x, true),
            "PadRight" if n == 1 || n == 2 => self.pad(call, x, false),
            "Equals" if n == 1 => Ok(self.bin(BinaryOp::EQ, x, call.args[0])),
            "CompareTo" if n == 1 => Ok(self.compare(x, call.args[0])),
            "Length" | "Contains" | "StartsWith" | "EndsWith" | "IndexOf" | "Substring"
            | "get_Chars" | "ToUpper" | "ToLower" | "Trim" | "TrimStart" | "TrimEnd"
            | "Replace" | "Insert" | "Remove" | "PadLeft" | "PadRight" | "Equals"
            | "CompareTo" => Err(call.form(format!("{n} argument(s)"))),
            _ => Err(call.unsupported()),
        }
    }

    fn string_static(&mut self, call: &Call) -> CompileResult<NodeId> {
        match (call.method.as_str(), call.args.as_slice()) {
            ("Concat", [first, rest @ ..]) if !rest.is_empty() => {
                let mut acc = self.as_string(*first);
                for &part in rest {
                    let part = self.as_string(part);
                    acc = self.bin_typed(BinaryOp::Concat, acc, part, &call.ty);
                }
                Ok(acc)
            }
            ("IsNullOrEmpty", &[s]) => {
                let copy = self.dup(s);
                let is_null = self.ir.unary(UnaryOp::IsNull, s);
                let len = self.len(copy);
                let zero = self.int(0);
                let empty = self.bin(BinaryOp::EQ, len, zero);
                Ok(self.bin_typed(BinaryOp::Or, is_null, empty, &ValueType::bool()))
            }
            ("Equals", &[a, b]) => Ok(self.bin(BinaryOp::EQ, a, b)),
            ("Compare", &[a, b]) => Ok(self.compare(a, b)),
            ("Concat" | "IsNullOrEmpty" | "Equals" | "Compare", args) => {
                Err(call.form(format!("{} argument(s)", args.len())))
            }
            _ => Err(call.unsupported()),
        }
    }

    /// `SqlMethods.Like(x, pattern [, escape])`
    pub(super) fn sql_like(&mut self, call: &Call) -> CompileResult<NodeId> {
        let (expr, pattern, escape) = match call.args.as_slice() {
            &[expr, pattern] => (expr, pattern, None),
            &[expr, pattern, escape] => (expr, pattern, Some(escape)),
            args => return Err(call.form(format!("{} argument(s)", args.len()))),
        };
        Ok(self.ir.add(
            NodeKind::Like {
                expr,
                pattern,
                escape,
            },
            call.ty.clone(),
        ))
    }

    /// `Contains`/`StartsWith`/`EndsWith` as LIKE
    fn like_search(&mut self, call: &Call, x: NodeId, anchor: Anchor) -> CompileResult<NodeId> {
        let arg = call.args[0];
        let (lead, trail) = match anchor {
            Anchor::Anywhere => ("%", "%"),
            Anchor::Start => ("", "%"),
            Anchor::End => ("%", ""),
        };
        let literal = match self.ir.as_value(arg) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Char(c)) => Some(c.to_string()),
            _ => None,
        };
        let is_parameter = matches!(self.ir.kind(arg), NodeKind::Parameter { .. });
        let (pattern, escape) = match literal {
            Some(text) => {
                let (escaped, needs_escape) = escape_like(&text);
                let pattern = self.string_lit(&format!("{lead}{escaped}{trail}"));
                let escape = if needs_escape {
                    Some(self.escape_lit())
                } else {
                    None
                };
                (pattern, escape)
            }
            None if is_parameter => {
                let mut pattern = self.escaped_parameter(arg);
                if !lead.is_empty() {
                    let wildcard = self.string_lit(lead);
                    pattern =
                        self.bin_typed(BinaryOp::Concat, wildcard, pattern, &ValueType::string());
                }
                if !trail.is_empty() {
                    let wildcard = self.string_lit(trail);
                    pattern =
                        self.bin_typed(BinaryOp::Concat, pattern, wildcard, &ValueType::string());
                }
                (pattern, Some(self.escape_lit()))
            }
            None => {
                return Err(call.form(
                    "the search text must be a literal or a query parameter",
                ))
            }
        };
        Ok(self.ir.add(
            NodeKind::Like {
                expr: x,
                pattern,
                escape,
            },
            call.ty.clone(),
        ))
    }

    fn escape_lit(&mut self) -> NodeId {
        self.string_lit(&LIKE_ESCAPE.to_string())
    }

    /// `REPLACE(...(REPLACE(p, '~', '~~'))...)` over every LIKE metacharacter
    fn escaped_parameter(&mut self, param: NodeId) -> NodeId {
        let ty = self.ir.ty(param).clone();
        let mut acc = param;
        for meta in [LIKE_ESCAPE, '%', '_', '['] {
            let from = self.string_lit(&meta.to_string());
            let to = self.string_lit(&format!("{LIKE_ESCAPE}{meta}"));
            acc = self.func("REPLACE", vec![acc, from, to], ty.clone());
        }
        acc
    }

    /// Zero-based position of a search text, `-1` when absent
    fn index_of(&mut self, call: &Call, x: NodeId) -> CompileResult<NodeId> {
        let s = call.args[0];
        let s = if self.ir.ty(s).scalar_kind() == Some(ScalarKind::Char) {
            self.as_string(s)
        } else {
            s
        };
        let probe = self.dup(s);
        let probe_len = self.len(probe);
        let zero = self.int(0);
        let empty = self.bin(BinaryOp::EQ, probe_len, zero);
        let one = self.int(1);
        match call.args.get(1) {
            None => {
                let found = self.func("CHARINDEX", vec![s, x], ValueType::int32());
                let position = self.bin(BinaryOp::Sub, found, one);
                let zero = self.int(0);
                Ok(self.iif(empty, zero, position))
            }
            Some(&start) => {
                // an empty search text is found at `start` while it is in range
                let whole = self.dup(x);
                let len = self.len(whole);
                let start_copy = self.dup(start);
                let next = self.plus_one(start_copy);
                let in_range = self.bin(BinaryOp::LE, next, len);
                let test = self.bin_typed(BinaryOp::And, empty, in_range, &ValueType::bool());
                let from = self.dup(start);
                let from = self.plus_one(from);
                let found = self.func("CHARINDEX", vec![s, x, from], ValueType::int32());
                let position = self.bin(BinaryOp::Sub, found, one);
                Ok(self.iif(test, start, position))
            }
        }
    }

    fn pad(&mut self, call: &Call, x: NodeId, left: bool) -> CompileResult<NodeId> {
        let width = call.args[0];
        let whole = self.dup(x);
        let len = self.len(whole);
        let width_copy = self.dup(width);
        let wide_enough = self.bin(BinaryOp::GE, len, width_copy);
        let whole = self.dup(x);
        let len = self.len(whole);
        let missing = self.bin(BinaryOp::Sub, width, len);
        let fill = match call.args.get(1) {
            None => self.func("SPACE", vec![missing], ValueType::string()),
            Some(&c) => {
                let c = self.as_string(c);
                self.func("REPLICATE", vec![c, missing], ValueType::string())
            }
        };
        let original = self.dup(x);
        let padded = if left {
            self.bin_typed(BinaryOp::Concat, fill, original, &call.ty)
        } else {
            self.bin_typed(BinaryOp::Concat, original, fill, &call.ty)
        };
        Ok(self.iif(wide_enough, x, padded))
    }

    /// `CASE WHEN a < b THEN -1 WHEN a > b THEN 1 ELSE 0 END`
    pub(super) fn compare(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let (a2, b2) = (self.dup(a), self.dup(b));
        let less = self.bin(BinaryOp::LT, a, b);
        let greater = self.bin(BinaryOp::GT, a2, b2);
        let minus_one = self.int(-1);
        let one = self.int(1);
        let zero = self.int(0);
        self.ir.searched_case(
            vec![
                When {
                    test: less,
                    value: minus_one,
                },
                When {
                    test: greater,
                    value: one,
                },
            ],
            zero,
        )
    }

    /// A string operand; chars and other scalars are converted
    fn as_string(&mut self, x: NodeId) -> NodeId {
        match self.ir.ty(x).scalar_kind() {
            Some(ScalarKind::String) => x,
            Some(ScalarKind::Char) => {
                let ty = self.ir.ty(x).clone();
                let nullable = ty.is_nullable();
                self.ir.node_mut(x).ty = if nullable {
                    ValueType::nullable(ScalarKind::String)
                } else {
                    ValueType::string()
                };
                x
            }
            _ => self.to_nvarchar(x),
        }
    }
}
