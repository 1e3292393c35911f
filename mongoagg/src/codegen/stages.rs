use super::{Error, MqlCodeGenerator, Result};
use crate::{air, context::AggregationContext};
use bson::{bson, doc, Bson, Document};
use mongoagg_datastructures::UniqueLinkedHashMap;

impl MqlCodeGenerator {
    /// Renders one stage into its wire document, resolving every embedded
    /// field reference against the stage's input context.
    pub fn codegen_stage(&self, stage: &air::Stage, ctx: &AggregationContext) -> Result<Document> {
        use air::Stage::*;
        match stage {
            Match(m) => self.codegen_match(m, ctx),
            Project(p) => self.codegen_project(p, ctx),
            AddFields(af) => self.codegen_add_fields(af, ctx),
            Group(g) => self.codegen_group(g, ctx),
            Sort(s) => self.codegen_sort(s, ctx),
            Unwind(u) => self.codegen_unwind(u, ctx),
            Limit(l) => Ok(doc! {"$limit": Bson::Int64(l.limit as i64)}),
            Skip(s) => Ok(doc! {"$skip": Bson::Int64(s.skip as i64)}),
            Lookup(l) => self.codegen_lookup(l, ctx),
            GeoNear(g) => self.codegen_geo_near(g, ctx),
            ReplaceRoot(r) => self.codegen_replace_root(r, ctx),
            Out(o) => Ok(doc! {"$out": o.collection.clone()}),
            Merge(m) => self.codegen_merge(m),
        }
    }

    fn codegen_match(&self, stage: &air::Match, ctx: &AggregationContext) -> Result<Document> {
        Ok(doc! {"$match": self.codegen_match_query(&stage.query, ctx)?})
    }

    fn codegen_project(&self, stage: &air::Project, ctx: &AggregationContext) -> Result<Document> {
        let mut specifications: UniqueLinkedHashMap<String, Bson> = UniqueLinkedHashMap::new();
        for entry in &stage.specifications {
            let value = match &entry.spec {
                air::ProjectionSpec::Include => {
                    // An included field whose wire path differs from its
                    // name renders as a reference, re-rooting it under the
                    // included name.
                    let resolved = ctx.resolve_field_path(&entry.target)?;
                    if resolved == entry.target {
                        Bson::Int32(1)
                    } else {
                        Bson::String(format!("${resolved}"))
                    }
                }
                air::ProjectionSpec::Exclude => Bson::Int32(0),
                air::ProjectionSpec::Expr(expr) => self.codegen_expression(expr, ctx)?,
            };
            // Last declaration wins when entries share a target name.
            specifications.insert_replacing(entry.target.clone(), value);
        }
        Ok(doc! {"$project": specifications.into_iter().collect::<Document>()})
    }

    fn codegen_add_fields(
        &self,
        stage: &air::AddFields,
        ctx: &AggregationContext,
    ) -> Result<Document> {
        let mut specifications: UniqueLinkedHashMap<String, Bson> = UniqueLinkedHashMap::new();
        for pair in &stage.specifications {
            let value = self.codegen_expression(&pair.expr, ctx)?;
            specifications.insert_replacing(pair.name.clone(), value);
        }
        Ok(doc! {"$addFields": specifications.into_iter().collect::<Document>()})
    }

    fn codegen_group(&self, stage: &air::Group, ctx: &AggregationContext) -> Result<Document> {
        let id = match stage.keys.as_slice() {
            [] => Bson::Null,
            [key] => self.codegen_expression(&key.expr, ctx)?,
            keys => {
                let mut id_doc: UniqueLinkedHashMap<String, Bson> = UniqueLinkedHashMap::new();
                for air::NameExprPair { name, expr } in keys {
                    id_doc
                        .insert(name.clone(), self.codegen_expression(expr, ctx)?)
                        .map_err(|e| Error::DuplicateGroupKey(e.0))?;
                }
                Bson::Document(id_doc.into_iter().collect())
            }
        };
        let mut group_doc = doc! {"_id": id};
        let mut aggregations: UniqueLinkedHashMap<String, Bson> = UniqueLinkedHashMap::new();
        for air::AccumulatorExpr {
            alias,
            function,
            arg,
        } in &stage.aggregations
        {
            let accumulator = if *function == air::AggregationFunction::Count {
                bson!({ "$sum": 1 })
            } else {
                bson!({ Self::agg_func_to_mql_op(*function): self.codegen_expression(arg, ctx)? })
            };
            aggregations
                .insert(alias.clone(), accumulator)
                .map_err(|e| Error::DuplicateGroupAlias(e.0))?;
        }
        group_doc.extend(aggregations.into_iter().collect::<Document>());
        Ok(doc! {"$group": group_doc})
    }

    fn codegen_sort(&self, stage: &air::Sort, ctx: &AggregationContext) -> Result<Document> {
        use air::SortDirection::*;
        let mut sort_doc = Document::new();
        for spec in &stage.specs {
            let key = match &spec.key {
                air::SortKey::Field(name) => ctx.resolve_field_path(name)?,
                air::SortKey::PreviousOperation => ctx.previous_operation_target()?,
            };
            let direction = match spec.direction {
                Ascending => Bson::Int32(1),
                Descending => Bson::Int32(-1),
            };
            sort_doc.insert(key, direction);
        }
        Ok(doc! {"$sort": sort_doc})
    }

    fn codegen_unwind(&self, stage: &air::Unwind, ctx: &AggregationContext) -> Result<Document> {
        let path = Bson::String(self.codegen_field_ref(&stage.path, ctx)?);
        let body = match (stage.index.clone(), stage.preserve_null_and_empty_arrays) {
            // The bare string form when no options are set.
            (None, false) => return Ok(doc! {"$unwind": path}),
            (Some(index), false) => doc! {"path": path, "includeArrayIndex": index},
            (Some(index), true) => {
                doc! {"path": path, "includeArrayIndex": index, "preserveNullAndEmptyArrays": true}
            }
            (None, true) => doc! {"path": path, "preserveNullAndEmptyArrays": true},
        };
        Ok(doc! {"$unwind": body})
    }

    fn codegen_lookup(&self, stage: &air::Lookup, ctx: &AggregationContext) -> Result<Document> {
        // The foreign side is opaque; only the local field resolves here.
        let local_field = ctx.resolve_field_path(&stage.local_field)?;
        Ok(doc! {"$lookup": {
            "from": stage.from.clone(),
            "localField": local_field,
            "foreignField": stage.foreign_field.clone(),
            "as": stage.as_field.clone(),
        }})
    }

    fn codegen_geo_near(&self, stage: &air::GeoNear, ctx: &AggregationContext) -> Result<Document> {
        let mut body = doc! {
            "near": [stage.near.0, stage.near.1],
            "distanceField": stage.distance_field.clone(),
            "spherical": stage.spherical,
        };
        if let Some(max_distance) = stage.max_distance {
            body.insert("maxDistance", max_distance);
        }
        if let Some(query) = &stage.query {
            body.insert("query", self.codegen_match_query(query, ctx)?);
        }
        Ok(doc! {"$geoNear": body})
    }

    fn codegen_replace_root(
        &self,
        stage: &air::ReplaceRoot,
        ctx: &AggregationContext,
    ) -> Result<Document> {
        let new_root = self.codegen_expression(&stage.new_root, ctx)?;
        Ok(doc! {"$replaceRoot": {"newRoot": new_root}})
    }

    fn codegen_merge(&self, stage: &air::Merge) -> Result<Document> {
        let mut body = doc! {"into": stage.into.clone()};
        if let Some(on) = &stage.on {
            body.insert("on", on.clone());
        }
        Ok(doc! {"$merge": body})
    }

    fn agg_func_to_mql_op(function: air::AggregationFunction) -> &'static str {
        use air::AggregationFunction::*;
        match function {
            AddToSet => "$addToSet",
            Avg => "$avg",
            Count => unreachable!(),
            First => "$first",
            Last => "$last",
            Max => "$max",
            Min => "$min",
            Push => "$push",
            Sum => "$sum",
        }
    }
}
