use super::{Error, MqlCodeGenerator, Result};
use crate::{air, context::AggregationContext};
use bson::{bson, Bson};

impl MqlCodeGenerator {
    pub fn codegen_expression(
        &self,
        expr: &air::Expression,
        ctx: &AggregationContext,
    ) -> Result<Bson> {
        use air::Expression::*;
        match expr {
            Literal(lit) => Ok(Self::codegen_literal(lit)),
            FieldRef(fr) => Ok(Bson::String(self.codegen_field_ref(fr, ctx)?)),
            Binary(binary) => {
                let operator = Self::to_mql_op(binary.op);
                let left = self.codegen_expression(&binary.left, ctx)?;
                let right = self.codegen_expression(&binary.right, ctx)?;
                Ok(bson!({ operator: [left, right] }))
            }
            Conditional(cond) => {
                // Completeness is checked before any branch is lowered.
                let otherwise = cond
                    .otherwise
                    .as_deref()
                    .ok_or(Error::IncompleteConditional)?;
                let predicate = self.codegen_expression(&cond.predicate, ctx)?;
                let then = self.codegen_expression(&cond.then, ctx)?;
                let otherwise = self.codegen_expression(otherwise, ctx)?;
                Ok(bson!({ "$cond": { "if": predicate, "then": then, "else": otherwise } }))
            }
            StringFunction(sf) => {
                let operator = Self::string_op(sf.function);
                match sf.function.arity() {
                    Some(expected) if sf.args.len() != expected => {
                        return Err(Error::InvalidArity {
                            function: operator,
                            expected,
                            found: sf.args.len(),
                        })
                    }
                    None if sf.args.is_empty() => {
                        return Err(Error::EmptyVariadic { function: operator })
                    }
                    _ => {}
                }
                let args = sf
                    .args
                    .iter()
                    .map(|arg| self.codegen_expression(arg, ctx))
                    .collect::<Result<Vec<Bson>>>()?;
                Ok(match sf.function.arity() {
                    Some(1) => bson!({ operator: args.into_iter().next().unwrap() }),
                    _ => bson!({ operator: Bson::Array(args) }),
                })
            }
            DateExtract(de) => {
                let operator = Self::date_part_op(de.part);
                let source = self.codegen_expression(&de.source, ctx)?;
                Ok(bson!({ operator: source }))
            }
            PreviousStageRef => Ok(Bson::String(format!(
                "${}",
                ctx.previous_operation_target()?
            ))),
        }
    }

    pub(super) fn codegen_field_ref(
        &self,
        field_ref: &air::FieldRef,
        ctx: &AggregationContext,
    ) -> Result<String> {
        let resolved = ctx.resolve_field_path(&field_ref.path)?;
        Ok(if resolved.starts_with("$$") {
            resolved
        } else {
            format!("${resolved}")
        })
    }

    /// Literals render as plain BSON values. Strings that could be misread
    /// as field references are wrapped in $literal.
    pub(super) fn codegen_literal(lit: &air::LiteralValue) -> Bson {
        use air::LiteralValue::*;
        match lit {
            Null => Bson::Null,
            Boolean(b) => Bson::Boolean(*b),
            String(s) => Self::wrap_in_literal_if(s.clone(), |s| s.starts_with('$')),
            Integer(i) => Bson::Int32(*i),
            Long(l) => Bson::Int64(*l),
            Double(d) => Bson::Double(*d),
        }
    }

    /// Wraps a string value, s, in $literal if the condition, f, is true
    /// for the string.
    fn wrap_in_literal_if<F>(s: String, f: F) -> Bson
    where
        F: Fn(&str) -> bool,
    {
        if f(&s) {
            bson!({ "$literal": s })
        } else {
            Bson::String(s)
        }
    }

    fn to_mql_op(op: air::BinaryOperator) -> &'static str {
        use air::BinaryOperator::*;
        match op {
            // Arithmetic operators
            Add => "$add",
            Subtract => "$subtract",
            Multiply => "$multiply",
            Divide => "$divide",
            Mod => "$mod",

            // Comparison operators
            Eq => "$eq",
            Ne => "$ne",
            Gt => "$gt",
            Gte => "$gte",
            Lt => "$lt",
            Lte => "$lte",
        }
    }

    fn string_op(op: air::StringOperator) -> &'static str {
        use air::StringOperator::*;
        match op {
            Concat => "$concat",
            ToUpper => "$toUpper",
            ToLower => "$toLower",
            StrLenCp => "$strLenCP",
            SubstrCp => "$substrCP",
            Split => "$split",
        }
    }

    fn date_part_op(part: air::DatePart) -> &'static str {
        use air::DatePart::*;
        match part {
            Year => "$year",
            Month => "$month",
            Week => "$week",
            DayOfMonth => "$dayOfMonth",
            DayOfYear => "$dayOfYear",
            Hour => "$hour",
            Minute => "$minute",
            Second => "$second",
        }
    }
}
