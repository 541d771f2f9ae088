use std::collections::BTreeSet;

use proptest::prelude::*;
use pullgraph_api::{PropertyValue, RelationshipDirection};
use pullgraph_query::{
    ExecConfig, ExecutionContext, Params, PlanBuilder, QueryExt, Row, SortItem, Value,
    VecRowSource, execute_collect,
};
use pullgraph_storage::MemGraph;

fn pair_rows(pairs: &[(i64, i64)]) -> Vec<Row> {
    pairs
        .iter()
        .map(|(a, b)| Row::default().with("a", Value::Int(*a)).with("b", Value::Int(*b)))
        .collect()
}

fn run_input(plan: &pullgraph_query::Plan, rows: Vec<Row>, columns: &[&str], batch: usize) -> Vec<Row> {
    let g = MemGraph::new();
    let params = Params::new();
    let source = VecRowSource::new(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap();
    let config = ExecConfig {
        input_batch_size: batch,
        ..ExecConfig::default()
    };
    let ctx = ExecutionContext::new(&g, &params)
        .with_config(config)
        .with_input(&source);
    let out = execute_collect(ctx, plan).unwrap();
    assert_eq!(source.open_count(), source.close_count());
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cartesian_product_size_is_the_product_of_its_sides(m in 0i64..6, n in 0i64..6) {
        let mut g = MemGraph::new();
        for i in 0..m {
            g.add_node(&["L"], &[("prop", PropertyValue::Int(i))]);
        }
        for i in 0..n {
            g.add_node(&["R"], &[("prop", PropertyValue::Int(i))]);
        }
        let plan = PlanBuilder::label_scan("l", "L")
            .cartesian_product(PlanBuilder::label_scan("r", "R"))
            .build();
        let rows = g.query_plan(&plan, &Params::new()).unwrap();
        prop_assert_eq!(rows.len() as i64, m * n);
        prop_assert!(g.stats().all_released());
    }

    #[test]
    fn apply_yields_the_sum_of_per_row_cardinalities(degrees in prop::collection::vec(0usize..4, 0..6)) {
        let mut g = MemGraph::new();
        let sink = g.add_node(&["Sink"], &[]);
        for degree in &degrees {
            let src = g.add_node(&["Src"], &[]);
            for _ in 0..*degree {
                g.add_edge(src, "R", sink);
            }
        }
        let plan = PlanBuilder::label_scan("s", "Src")
            .apply(PlanBuilder::argument(&["s"]).expand(
                "s",
                "r",
                "t",
                RelationshipDirection::Outgoing,
                &[],
            ))
            .build();
        let rows = g.query_plan(&plan, &Params::new()).unwrap();
        prop_assert_eq!(rows.len(), degrees.iter().sum::<usize>());
        prop_assert!(g.stats().all_released());
    }

    #[test]
    fn input_batch_size_never_changes_the_output(
        values in prop::collection::vec(-50i64..50, 0..40),
        batch in 1usize..16,
    ) {
        let rows: Vec<Row> = values.iter().map(|v| Row::default().with("x", Value::Int(*v))).collect();
        let plan = PlanBuilder::input(&["x"]).build();
        let batched = run_input(&plan, rows.clone(), &["x"], batch);
        let whole = run_input(&plan, rows.clone(), &["x"], 1024);
        prop_assert_eq!(&batched, &rows);
        prop_assert_eq!(batched, whole);
    }

    #[test]
    fn stacked_sorts_match_the_outer_sort_alone(
        raw in prop::collection::vec((0i64..4, 0i64..4), 0..20),
    ) {
        // Distinct pairs, so (a, b) is a total order on the rows.
        let mut seen = BTreeSet::new();
        let pairs: Vec<(i64, i64)> = raw.into_iter().filter(|p| seen.insert(*p)).collect();

        let stacked = PlanBuilder::input(&["a", "b"])
            .sort(vec![SortItem::asc("b"), SortItem::desc("a")])
            .sort(vec![SortItem::desc("a"), SortItem::asc("b")])
            .build();
        let single = PlanBuilder::input(&["a", "b"])
            .sort(vec![SortItem::desc("a"), SortItem::asc("b")])
            .build();

        let from_stacked = run_input(&stacked, pair_rows(&pairs), &["a", "b"], 7);
        let from_single = run_input(&single, pair_rows(&pairs), &["a", "b"], 7);
        prop_assert_eq!(from_stacked, from_single);
    }
}
