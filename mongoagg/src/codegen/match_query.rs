use super::{MqlCodeGenerator, Result};
use crate::{air, context::AggregationContext};
use bson::{doc, Bson, Document};

impl MqlCodeGenerator {
    /// Criteria render in the query language (`{field: {"$gte": v}}`), not
    /// the expression language; field names still resolve through the
    /// stage's input context.
    pub fn codegen_match_query(
        &self,
        query: &air::MatchQuery,
        ctx: &AggregationContext,
    ) -> Result<Document> {
        use air::MatchQuery::*;
        match query {
            And(args) => self.codegen_match_logical_operator("$and", args, ctx),
            Or(args) => self.codegen_match_logical_operator("$or", args, ctx),
            Comparison(c) => {
                let field = ctx.resolve_field_path(&c.field)?;
                let op = Self::match_comparison_op(c.function);
                let arg = Self::codegen_match_literal(&c.arg);
                Ok(doc! { field: { op: arg } })
            }
            In(i) => {
                let field = ctx.resolve_field_path(&i.field)?;
                let values = i
                    .values
                    .iter()
                    .map(Self::codegen_match_literal)
                    .collect::<Vec<Bson>>();
                Ok(doc! { field: { "$in": values } })
            }
            Regex(r) => {
                let field = ctx.resolve_field_path(&r.field)?;
                Ok(doc! { field: { "$regex": r.regex.clone(), "$options": r.options.clone() } })
            }
            Exists(e) => {
                let field = ctx.resolve_field_path(&e.field)?;
                Ok(doc! { field: { "$exists": e.exists } })
            }
        }
    }

    fn codegen_match_logical_operator(
        &self,
        op_name: &str,
        args: &[air::MatchQuery],
        ctx: &AggregationContext,
    ) -> Result<Document> {
        let args = args
            .iter()
            .map(|arg| self.codegen_match_query(arg, ctx).map(Bson::Document))
            .collect::<Result<Vec<_>>>()?;
        Ok(doc! { op_name: Bson::Array(args) })
    }

    fn match_comparison_op(op: air::MatchComparisonOp) -> &'static str {
        use air::MatchComparisonOp::*;
        match op {
            Lt => "$lt",
            Lte => "$lte",
            Ne => "$ne",
            Eq => "$eq",
            Gt => "$gt",
            Gte => "$gte",
        }
    }

    /// Query-language literals are never $literal-wrapped.
    fn codegen_match_literal(lit: &air::LiteralValue) -> Bson {
        use air::LiteralValue::*;
        match lit {
            Null => Bson::Null,
            Boolean(b) => Bson::Boolean(*b),
            String(s) => Bson::String(s.clone()),
            Integer(i) => Bson::Int32(*i),
            Long(l) => Bson::Int64(*l),
            Double(d) => Bson::Double(*d),
        }
    }
}
