use crate::{air::Stage, context::AggregationContext};

fn initial() -> AggregationContext {
    AggregationContext::initial()
}

fn after(stage: impl Into<Stage>) -> AggregationContext {
    initial().advance(&stage.into())
}

macro_rules! test_codegen_expr {
    ($func_name:ident, expected = $expected:expr, input = $input:expr) => {
        test_codegen_expr!(
            $func_name,
            expected = $expected,
            input = $input,
            context = super::initial()
        );
    };
    ($func_name:ident, expected = $expected:expr, input = $input:expr, context = $context:expr) => {
        #[test]
        fn $func_name() {
            use crate::codegen::MqlCodeGenerator;
            let expected = $expected;
            let input = $input;
            let context = $context;

            let gen = MqlCodeGenerator::default();
            assert_eq!(expected, gen.codegen_expression(&input, &context));
        }
    };
}

macro_rules! test_codegen_stage {
    ($func_name:ident, expected = $expected:expr, input = $input:expr) => {
        test_codegen_stage!(
            $func_name,
            expected = $expected,
            input = $input,
            context = super::initial()
        );
    };
    ($func_name:ident, expected = $expected:expr, input = $input:expr, context = $context:expr) => {
        #[test]
        fn $func_name() {
            use crate::{air::Stage, codegen::MqlCodeGenerator};
            let expected = $expected;
            let input: Stage = $input.into();
            let context = $context;

            let gen = MqlCodeGenerator::default();
            assert_eq!(expected, gen.codegen_stage(&input, &context));
        }
    };
}

mod literal {
    use crate::air::*;
    use bson::{bson, Bson};

    test_codegen_expr!(null, expected = Ok(Bson::Null), input = lit(LiteralValue::Null));

    test_codegen_expr!(boolean, expected = Ok(bson!(true)), input = lit(true));

    test_codegen_expr!(
        string,
        expected = Ok(bson!("foo")),
        input = lit("foo")
    );

    test_codegen_expr!(
        dollar_prefixed_string_is_wrapped,
        expected = Ok(bson!({"$literal": "$tags"})),
        input = lit("$tags")
    );

    test_codegen_expr!(int, expected = Ok(bson!(1_i32)), input = lit(1));

    test_codegen_expr!(long, expected = Ok(bson!(2_i64)), input = lit(2_i64));

    test_codegen_expr!(double, expected = Ok(bson!(3.0)), input = lit(3.0));
}

mod field_ref {
    use crate::air::*;
    use bson::bson;

    test_codegen_expr!(
        simple,
        expected = Ok(bson!("$tags")),
        input = field("tags")
    );

    test_codegen_expr!(
        dotted_path,
        expected = Ok(bson!("$customer.address.city")),
        input = field("customer.address.city")
    );

    test_codegen_expr!(
        root_marker,
        expected = Ok(bson!("$$ROOT")),
        input = field("$$ROOT")
    );

    test_codegen_expr!(
        unknown_system_variable,
        expected = Err(crate::codegen::Error::Binding(
            crate::context::Error::UnknownSystemVariable("$$BOGUS".to_string())
        )),
        input = field("$$BOGUS")
    );

    test_codegen_expr!(
        resolves_through_the_input_context,
        expected = Ok(bson!("$_id.state")),
        input = field("state"),
        context = super::after(group(["state", "city"]).sum("pop", "pop"))
    );

    test_codegen_expr!(
        unresolvable_root_is_a_binding_error,
        expected = Err(crate::codegen::Error::Binding(
            crate::context::Error::FieldNotFound {
                path: "title".to_string(),
                visible: "_id, n".to_string(),
            }
        )),
        input = field("title"),
        context = super::after(group(["tags"]).count("n"))
    );
}

mod binary {
    use crate::air::*;
    use bson::bson;

    test_codegen_expr!(
        add,
        expected = Ok(bson!({"$add": ["$qty", 1]})),
        input = binary(BinaryOperator::Add, field("qty"), lit(1))
    );

    test_codegen_expr!(
        subtract,
        expected = Ok(bson!({"$subtract": ["$total", "$discount"]})),
        input = binary(BinaryOperator::Subtract, field("total"), field("discount"))
    );

    test_codegen_expr!(
        multiply,
        expected = Ok(bson!({"$multiply": ["$price", "$qty"]})),
        input = binary(BinaryOperator::Multiply, field("price"), field("qty"))
    );

    test_codegen_expr!(
        divide,
        expected = Ok(bson!({"$divide": ["$sum", "$count"]})),
        input = binary(BinaryOperator::Divide, field("sum"), field("count"))
    );

    test_codegen_expr!(
        gte,
        expected = Ok(bson!({"$gte": ["$pop", 10000000]})),
        input = binary(BinaryOperator::Gte, field("pop"), lit(10_000_000))
    );

    test_codegen_expr!(
        nested_operands,
        expected = Ok(bson!({"$mod": [{"$add": ["$a", "$b"]}, 2]})),
        input = binary(
            BinaryOperator::Mod,
            binary(BinaryOperator::Add, field("a"), field("b")),
            lit(2)
        )
    );
}

mod conditional {
    use crate::air::*;
    use bson::bson;

    test_codegen_expr!(
        complete,
        expected = Ok(bson!({
            "$cond": {
                "if": {"$gte": ["$pop", 1000]},
                "then": "big",
                "else": "small",
            }
        })),
        input = when(binary(BinaryOperator::Gte, field("pop"), lit(1000)))
            .then(lit("big"))
            .otherwise(lit("small"))
    );

    test_codegen_expr!(
        nested_in_else_branch,
        expected = Ok(bson!({
            "$cond": {
                "if": {"$gte": ["$score", 90]},
                "then": "a",
                "else": {
                    "$cond": {
                        "if": {"$gte": ["$score", 80]},
                        "then": "b",
                        "else": "c",
                    }
                },
            }
        })),
        input = when(binary(BinaryOperator::Gte, field("score"), lit(90)))
            .then(lit("a"))
            .otherwise(
                when(binary(BinaryOperator::Gte, field("score"), lit(80)))
                    .then(lit("b"))
                    .otherwise(lit("c"))
            )
    );

    test_codegen_expr!(
        missing_else_branch,
        expected = Err(crate::codegen::Error::IncompleteConditional),
        input = Expression::from(
            when(binary(BinaryOperator::Gte, field("pop"), lit(1000))).then(lit("big"))
        )
    );
}

mod string_function {
    use crate::air::*;
    use bson::bson;

    test_codegen_expr!(
        to_upper_renders_unary,
        expected = Ok(bson!({"$toUpper": "$name"})),
        input = string_function(StringOperator::ToUpper, vec![field("name")])
    );

    test_codegen_expr!(
        concat_renders_n_ary,
        expected = Ok(bson!({"$concat": ["$first", " ", "$last"]})),
        input = string_function(
            StringOperator::Concat,
            vec![field("first"), lit(" "), field("last")]
        )
    );

    test_codegen_expr!(
        concat_requires_an_argument,
        expected = Err(crate::codegen::Error::EmptyVariadic {
            function: "$concat"
        }),
        input = string_function(StringOperator::Concat, vec![])
    );

    test_codegen_expr!(
        substr_arity_is_checked_before_lowering,
        expected = Err(crate::codegen::Error::InvalidArity {
            function: "$substrCP",
            expected: 3,
            found: 1,
        }),
        input = string_function(StringOperator::SubstrCp, vec![field("s")])
    );

    test_codegen_expr!(
        split,
        expected = Ok(bson!({"$split": ["$csv", ","]})),
        input = string_function(StringOperator::Split, vec![field("csv"), lit(",")])
    );
}

mod date_extract {
    use crate::air::*;
    use bson::bson;

    test_codegen_expr!(
        year,
        expected = Ok(bson!({"$year": "$orderedAt"})),
        input = date_part(DatePart::Year, field("orderedAt"))
    );

    test_codegen_expr!(
        day_of_year,
        expected = Ok(bson!({"$dayOfYear": "$orderedAt"})),
        input = date_part(DatePart::DayOfYear, field("orderedAt"))
    );
}

mod previous_stage_ref {
    use crate::air::*;
    use bson::bson;

    test_codegen_expr!(
        resolves_to_the_group_key,
        expected = Ok(bson!("$_id")),
        input = Expression::PreviousStageRef,
        context = super::after(group(["tags"]).count("n"))
    );

    test_codegen_expr!(
        fails_without_a_previous_stage,
        expected = Err(crate::codegen::Error::Binding(
            crate::context::Error::NoPreviousStage
        )),
        input = Expression::PreviousStageRef
    );
}

mod match_stage {
    use crate::air::*;
    use bson::doc;

    test_codegen_stage!(
        comparison,
        expected = Ok(doc! {"$match": {"totalPop": {"$gte": 10000000}}}),
        input = matching(criteria("totalPop").gte(10_000_000))
    );

    test_codegen_stage!(
        and_of_comparisons,
        expected = Ok(doc! {"$match": {"$and": [
            {"qty": {"$gt": 10}},
            {"qty": {"$lte": 100}},
        ]}}),
        input = matching(criteria("qty").gt(10).and(criteria("qty").lte(100)))
    );

    test_codegen_stage!(
        or_of_comparisons,
        expected = Ok(doc! {"$match": {"$or": [
            {"state": {"$eq": "NY"}},
            {"state": {"$eq": "CA"}},
        ]}}),
        input = matching(criteria("state").eq("NY").or(criteria("state").eq("CA")))
    );

    test_codegen_stage!(
        in_list,
        expected = Ok(doc! {"$match": {"status": {"$in": ["A", "B"]}}}),
        input = matching(criteria("status").is_in(vec!["A".into(), "B".into()]))
    );

    test_codegen_stage!(
        regex,
        expected = Ok(doc! {"$match": {"name": {"$regex": "^spring", "$options": "i"}}}),
        input = matching(criteria("name").regex("^spring", "i"))
    );

    test_codegen_stage!(
        exists,
        expected = Ok(doc! {"$match": {"deletedAt": {"$exists": false}}}),
        input = matching(criteria("deletedAt").exists(false))
    );

    test_codegen_stage!(
        field_names_resolve_through_the_context,
        expected = Ok(doc! {"$match": {"_id.state": {"$eq": "NY"}}}),
        input = matching(criteria("state").eq("NY")),
        context = super::after(group(["state", "city"]).sum("pop", "pop"))
    );
}

mod project_stage {
    use crate::air::*;
    use bson::doc;

    test_codegen_stage!(
        includes,
        expected = Ok(doc! {"$project": {"tags": 1}}),
        input = project(["tags"])
    );

    test_codegen_stage!(
        include_and_exclude,
        expected = Ok(doc! {"$project": {"x": 1, "y": 1, "_id": 0}}),
        input = project(["x", "y"]).and_exclude("_id")
    );

    test_codegen_stage!(
        previous_operation_entry,
        expected = Ok(doc! {"$project": {"n": 1, "tag": "$_id"}}),
        input = project(["n"]).and("tag").previous_operation(),
        context = super::after(group(["tags"]).count("n"))
    );

    test_codegen_stage!(
        include_renders_a_reference_when_the_path_moved,
        expected = Ok(doc! {"$project": {"state": "$_id.state"}}),
        input = project(["state"]),
        context = super::after(group(["state", "city"]).sum("pop", "pop"))
    );

    test_codegen_stage!(
        computed_entry,
        expected = Ok(doc! {"$project": {"total": {"$multiply": ["$price", "$qty"]}}}),
        input = project([]).and("total").from_expression(binary(
            BinaryOperator::Multiply,
            field("price"),
            field("qty")
        ))
    );

    test_codegen_stage!(
        aliased_field_entry,
        expected = Ok(doc! {"$project": {"cityName": "$city.name"}}),
        input = project([]).and("cityName").from_field("city.name")
    );

    test_codegen_stage!(
        last_declaration_wins_on_shadowed_targets,
        expected = Ok(doc! {"$project": {"total": {"$add": ["$a", "$b"]}}}),
        input = project(["total"]).and("total").from_expression(binary(
            BinaryOperator::Add,
            field("a"),
            field("b")
        ))
    );

    test_codegen_stage!(
        include_of_an_unexposed_field_fails,
        expected = Err(crate::codegen::Error::Binding(
            crate::context::Error::FieldNotFound {
                path: "title".to_string(),
                visible: "_id, n".to_string(),
            }
        )),
        input = project(["title"]),
        context = super::after(group(["tags"]).count("n"))
    );
}

mod add_fields_stage {
    use crate::air::*;
    use bson::doc;

    test_codegen_stage!(
        computed_overlay,
        expected = Ok(doc! {"$addFields": {"doubled": {"$multiply": ["$n", 2]}}}),
        input = add_fields().set(
            "doubled",
            binary(BinaryOperator::Multiply, field("n"), lit(2))
        )
    );
}

mod group_stage {
    use crate::air::*;
    use bson::{doc, Bson};

    test_codegen_stage!(
        single_key_with_count,
        expected = Ok(doc! {"$group": {"_id": "$tags", "n": {"$sum": 1}}}),
        input = group(["tags"]).count("n")
    );

    test_codegen_stage!(
        composite_key,
        expected = Ok(doc! {"$group": {
            "_id": {"state": "$state", "city": "$city"},
            "pop": {"$sum": "$pop"},
        }}),
        input = group(["state", "city"]).sum("pop", "pop")
    );

    test_codegen_stage!(
        null_key_groups_everything,
        expected = Ok(doc! {"$group": {"_id": Bson::Null, "avgScore": {"$avg": "$score"}}}),
        input = group([]).avg("score", "avgScore")
    );

    test_codegen_stage!(
        expression_key,
        expected = Ok(doc! {"$group": {"_id": {"$year": "$orderedAt"}, "n": {"$sum": 1}}}),
        input = group([])
            .key("year", date_part(DatePart::Year, field("orderedAt")))
            .count("n")
    );

    test_codegen_stage!(
        accumulator_vocabulary,
        expected = Ok(doc! {"$group": {
            "_id": "$state",
            "biggest": {"$last": "$city"},
            "smallest": {"$first": "$city"},
            "all": {"$push": "$city"},
            "distinct": {"$addToSet": "$city"},
            "most": {"$max": "$pop"},
            "least": {"$min": "$pop"},
        }}),
        input = group(["state"])
            .last("city", "biggest")
            .first("city", "smallest")
            .push("city", "all")
            .add_to_set("city", "distinct")
            .max("pop", "most")
            .min("pop", "least")
    );

    test_codegen_stage!(
        keys_resolve_through_the_context,
        expected = Ok(doc! {"$group": {
            "_id": "$_id.state",
            "biggestCity": {"$last": "$_id.city"},
        }}),
        input = group(["state"]).last("city", "biggestCity"),
        context = super::after(group(["state", "city"]).sum("pop", "pop"))
    );

    test_codegen_stage!(
        duplicate_accumulator_alias,
        expected = Err(crate::codegen::Error::DuplicateGroupAlias("n".to_string())),
        input = group(["tags"]).count("n").sum("pop", "n")
    );

    test_codegen_stage!(
        duplicate_composite_key,
        expected = Err(crate::codegen::Error::DuplicateGroupKey("state".to_string())),
        input = group(["state", "state"]).count("n")
    );
}

mod sort_stage {
    use crate::air::*;
    use bson::doc;

    test_codegen_stage!(
        descending,
        expected = Ok(doc! {"$sort": {"n": -1}}),
        input = sort(SortDirection::Descending, ["n"])
    );

    test_codegen_stage!(
        mixed_directions,
        expected = Ok(doc! {"$sort": {"pop": 1, "name": -1}}),
        input = sort(SortDirection::Ascending, ["pop"]).and(SortDirection::Descending, ["name"])
    );

    test_codegen_stage!(
        keys_resolve_through_the_context,
        expected = Ok(doc! {"$sort": {"pop": 1, "_id.state": 1, "_id.city": 1}}),
        input = sort(SortDirection::Ascending, ["pop", "state", "city"]),
        context = super::after(group(["state", "city"]).sum("pop", "pop"))
    );

    test_codegen_stage!(
        previous_operation_key,
        expected = Ok(doc! {"$sort": {"_id": 1, "totalPop": 1}}),
        input = sort(SortDirection::Ascending, [previous_operation(), "totalPop".into()]),
        context = super::after(group(["state"]).sum("pop", "totalPop"))
    );
}

mod unwind_stage {
    use crate::air::*;
    use bson::doc;

    test_codegen_stage!(
        bare_path_uses_the_short_form,
        expected = Ok(doc! {"$unwind": "$tags"}),
        input = unwind("tags")
    );

    test_codegen_stage!(
        with_index,
        expected = Ok(doc! {"$unwind": {"path": "$tags", "includeArrayIndex": "n"}}),
        input = unwind("tags").with_index("n")
    );

    test_codegen_stage!(
        preserve_null_and_empty,
        expected = Ok(doc! {"$unwind": {"path": "$tags", "preserveNullAndEmptyArrays": true}}),
        input = unwind("tags").preserve_null_and_empty_arrays()
    );

    test_codegen_stage!(
        with_index_and_preserve,
        expected = Ok(doc! {"$unwind": {
            "path": "$tags",
            "includeArrayIndex": "n",
            "preserveNullAndEmptyArrays": true,
        }}),
        input = unwind("tags").with_index("n").preserve_null_and_empty_arrays()
    );
}

mod limit_skip_stages {
    use crate::air::*;
    use bson::doc;

    test_codegen_stage!(
        limit_renders_int64,
        expected = Ok(doc! {"$limit": 10_i64}),
        input = limit(10)
    );

    test_codegen_stage!(
        skip_renders_int64,
        expected = Ok(doc! {"$skip": 5_i64}),
        input = skip(5)
    );
}

mod lookup_stage {
    use crate::air::*;
    use bson::doc;

    test_codegen_stage!(
        simple,
        expected = Ok(doc! {"$lookup": {
            "from": "orders",
            "localField": "customerId",
            "foreignField": "_id",
            "as": "orders",
        }}),
        input = lookup("orders", "customerId", "_id", "orders")
    );

    test_codegen_stage!(
        local_field_resolves_through_the_context,
        expected = Ok(doc! {"$lookup": {
            "from": "states",
            "localField": "_id.state",
            "foreignField": "code",
            "as": "stateDoc",
        }}),
        input = lookup("states", "state", "code", "stateDoc"),
        context = super::after(group(["state", "city"]).sum("pop", "pop"))
    );
}

mod geo_near_stage {
    use crate::air::*;
    use bson::doc;

    test_codegen_stage!(
        minimal,
        expected = Ok(doc! {"$geoNear": {
            "near": [-73.99, 40.73],
            "distanceField": "distance",
            "spherical": false,
        }}),
        input = geo_near((-73.99, 40.73), "distance")
    );

    test_codegen_stage!(
        with_max_distance_and_query,
        expected = Ok(doc! {"$geoNear": {
            "near": [-73.99, 40.73],
            "distanceField": "distance",
            "spherical": true,
            "maxDistance": 5000.0,
            "query": {"category": {"$eq": "cafe"}},
        }}),
        input = geo_near((-73.99, 40.73), "distance")
            .spherical()
            .max_distance(5000.0)
            .query(criteria("category").eq("cafe"))
    );
}

mod replace_root_stage {
    use crate::air::*;
    use bson::doc;

    test_codegen_stage!(
        promotes_a_subdocument,
        expected = Ok(doc! {"$replaceRoot": {"newRoot": "$customer"}}),
        input = replace_root(field("customer"))
    );
}

mod terminal_stages {
    use crate::air::*;
    use bson::doc;

    test_codegen_stage!(
        out,
        expected = Ok(doc! {"$out": "tagCounts"}),
        input = crate::air::out("tagCounts")
    );

    test_codegen_stage!(
        merge,
        expected = Ok(doc! {"$merge": {"into": "tagCounts"}}),
        input = merge_into("tagCounts")
    );

    test_codegen_stage!(
        merge_with_on,
        expected = Ok(doc! {"$merge": {"into": "tagCounts", "on": "_id"}}),
        input = merge_into("tagCounts").on("_id")
    );
}
