use std::sync::atomic::Ordering;

use pullgraph_api::{PropertyValue, RelationshipDirection};
use pullgraph_query::{
    Error, ExecutionContext, Expression, IndexPredicate, Params, PlanBuilder, QueryExt, RangeBound,
    Value, execute,
};
use pullgraph_storage::MemGraph;

fn chain_graph() -> MemGraph {
    let mut g = MemGraph::new();
    let hubs: Vec<_> = (0..4)
        .map(|i| g.add_node(&["Hub"], &[("prop", PropertyValue::Int(i))]))
        .collect();
    let leaves: Vec<_> = (0..6).map(|_| g.add_node(&["Leaf"], &[])).collect();
    for hub in &hubs {
        for leaf in &leaves {
            g.add_edge(*hub, "LINK", *leaf);
        }
    }
    g
}

fn people() -> MemGraph {
    let mut g = MemGraph::new();
    g.add_node(&["Person"], &[("age", 30_i64.into())]);
    g.add_node(&["Person"], &[("age", 30.0_f64.into())]);
    g.add_node(&["Person"], &[("age", 41_i64.into())]);
    g.add_node(&["Person"], &[("age", "unknown".into())]);
    g.add_node(&["Person"], &[]);
    g.create_index("Person", "age");
    g
}

#[test]
fn limit_over_a_deep_tree_releases_every_cursor_once() {
    let g = chain_graph();
    let plan = PlanBuilder::label_scan("h", "Hub")
        .expand("h", "r", "l", RelationshipDirection::Outgoing, &["LINK"])
        .cartesian_product(PlanBuilder::label_scan("x", "Hub"))
        .filter(Expression::cached("h", "prop").gte(Expression::lit(0)))
        .limit(Expression::lit(3))
        .build();

    let rows = g.query_plan(&plan, &Params::new()).unwrap();
    assert_eq!(rows.len(), 3);
    let stats = g.stats();
    assert_eq!(stats.double_closes, 0);
    assert_eq!(stats.leaked, 0);
    assert!(stats.all_released());
}

#[test]
fn dropping_a_partially_read_result_releases_everything() {
    let g = chain_graph();
    let plan = PlanBuilder::label_scan("h", "Hub")
        .apply(PlanBuilder::argument(&["h"]).expand(
            "h",
            "r",
            "l",
            RelationshipDirection::Outgoing,
            &[],
        ))
        .build();
    let params = Params::new();
    let mut result = execute(ExecutionContext::new(&g, &params), &plan).unwrap();
    for _ in 0..8 {
        result.next().unwrap().unwrap();
    }
    drop(result);
    assert!(g.stats().all_released());
}

#[test]
fn close_failure_is_reported_after_every_cursor_was_closed() {
    let g = chain_graph();
    let plan = PlanBuilder::label_scan("a", "Hub")
        .hash_join(&["a"], PlanBuilder::label_scan("a", "Hub"))
        .build();
    let params = Params::new();
    let mut result = execute(ExecutionContext::new(&g, &params), &plan).unwrap();
    g.faults().fail_cursor_close_at.store(1, Ordering::SeqCst);

    let err = result.close().unwrap_err();
    assert!(matches!(
        err,
        Error::Collaborator(pullgraph_api::Error::CloseFailed(_))
    ));
    let stats = g.stats();
    assert_eq!(stats.cursors_opened, 2);
    assert_eq!(stats.cursors_closed, 2);
    assert_eq!(stats.leaked, 0);

    // Already closed: nothing left to release.
    assert!(result.close().is_ok());
    assert_eq!(g.stats().double_closes, 0);
}

#[test]
fn close_failure_at_exhaustion_surfaces_as_the_last_item() {
    let g = chain_graph();
    let plan = PlanBuilder::label_scan("h", "Hub").build();
    let params = Params::new();
    g.faults().fail_cursor_close_at.store(1, Ordering::SeqCst);

    let items: Vec<_> = execute(ExecutionContext::new(&g, &params), &plan)
        .unwrap()
        .collect();
    assert_eq!(items.len(), 5);
    assert!(items[..4].iter().all(Result::is_ok));
    assert!(items[4].is_err());
    assert!(g.stats().leaked == 0);
}

#[test]
fn collaborator_failure_mid_stream_closes_the_tree() {
    let g = chain_graph();
    g.faults().fail_relationships_at.store(2, Ordering::SeqCst);
    let plan = PlanBuilder::label_scan("h", "Hub")
        .expand("h", "r", "l", RelationshipDirection::Outgoing, &[])
        .build();

    let err = g.query_plan(&plan, &Params::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Collaborator(pullgraph_api::Error::Storage(_))
    ));
    assert!(g.stats().all_released());
}

#[test]
fn index_seek_finds_numbers_across_int_and_float() {
    let g = people();
    let plan = PlanBuilder::index_seek(
        "p",
        "Person",
        "age",
        vec![IndexPredicate::exact(Expression::param("age"))],
    )
    .build();
    let mut params = Params::new();
    params.insert("age".into(), Value::Int(30));

    let rows = g.query_plan(&plan, &params).unwrap();
    let ids: Vec<_> = rows.iter().filter_map(|r| r.get_node("p")).collect();
    assert_eq!(ids, vec![0, 1]);
    assert!(g.stats().all_released());
}

#[test]
fn index_seek_ranges_and_prefixes_route_by_value_family() {
    let g = people();
    let older = PlanBuilder::index_seek(
        "p",
        "Person",
        "age",
        vec![IndexPredicate::range(
            Some(RangeBound::exclusive(Expression::lit(30))),
            None,
        )],
    )
    .build();
    let rows = g.query_plan(&older, &Params::new()).unwrap();
    assert_eq!(rows.iter().filter_map(|r| r.get_node("p")).collect::<Vec<_>>(), vec![2]);

    let text = PlanBuilder::index_seek(
        "p",
        "Person",
        "age",
        vec![IndexPredicate::prefix(Expression::lit("unk"))],
    )
    .build();
    let rows = g.query_plan(&text, &Params::new()).unwrap();
    assert_eq!(rows.iter().filter_map(|r| r.get_node("p")).collect::<Vec<_>>(), vec![3]);
    assert!(g.stats().all_released());
}

#[test]
fn index_seek_on_null_matches_nothing() {
    let g = people();
    let plan = PlanBuilder::index_seek(
        "p",
        "Person",
        "age",
        vec![IndexPredicate::exact(Expression::null())],
    )
    .build();
    assert!(g.query_plan(&plan, &Params::new()).unwrap().is_empty());
    assert!(g.stats().all_released());
}

#[test]
fn valueless_index_query_is_signalled_as_unsupported() {
    let g = people();
    let plan = PlanBuilder::index_seek("p", "Person", "age", vec![IndexPredicate::Exists]).build();

    let err = g.query_plan(&plan, &Params::new()).unwrap_err();
    assert!(err.is_unsupported());
    let stats = g.stats();
    assert_eq!(stats.cursors_opened, 0);
    assert!(stats.all_released());
}

#[test]
fn missing_index_is_reported() {
    let g = people();
    let plan = PlanBuilder::index_seek(
        "p",
        "Person",
        "name",
        vec![IndexPredicate::exact(Expression::lit("x"))],
    )
    .build();
    let err = g.query_plan(&plan, &Params::new()).unwrap_err();
    assert!(matches!(err, Error::IndexNotFound { .. }));
}

fn numbered(label: &str, n: i64) -> MemGraph {
    let mut g = MemGraph::new();
    for i in 0..n {
        g.add_node(&[label], &[("prop", PropertyValue::Int(i))]);
    }
    g
}

fn assert_storage_failure(err: Error) {
    assert!(
        matches!(err, Error::Collaborator(pullgraph_api::Error::Storage(_))),
        "unexpected error {err:?}"
    );
}

#[test]
fn left_failure_under_an_empty_right_side_reaches_the_consumer() {
    let g = numbered("A", 3);
    g.faults().fail_property_read_at.store(2, Ordering::SeqCst);
    let plan = PlanBuilder::label_scan("a", "A")
        .filter(Expression::cached("a", "prop").lt(Expression::lit(10)))
        .cartesian_product(PlanBuilder::label_scan("m", "Missing"))
        .build();

    assert_storage_failure(g.query_plan(&plan, &Params::new()).unwrap_err());
    assert!(g.stats().all_released());
}

#[test]
fn right_failure_under_apply_reaches_the_consumer() {
    let g = numbered("A", 3);
    g.faults().fail_property_read_at.store(2, Ordering::SeqCst);
    let plan = PlanBuilder::label_scan("a", "A")
        .apply(
            PlanBuilder::argument(&["a"])
                .filter(Expression::cached("a", "prop").lt(Expression::lit(10))),
        )
        .build();

    let params = Params::new();
    let items: Vec<_> = execute(ExecutionContext::new(&g, &params), &plan)
        .unwrap()
        .collect();
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(items[1].is_err());
    assert!(g.stats().all_released());
}

#[test]
fn hash_join_failures_on_either_side_reach_the_consumer() {
    let mut g = numbered("A", 2);
    g.add_node(&["B"], &[("prop", PropertyValue::Int(0))]);
    g.add_node(&["B"], &[("prop", PropertyValue::Int(1))]);
    let plan = PlanBuilder::label_scan("a", "A")
        .projection(vec![("k", Expression::prop("a", "prop"))])
        .hash_join(
            &["k"],
            PlanBuilder::label_scan("b", "B")
                .projection(vec![("k", Expression::prop("b", "prop"))]),
        )
        .build();

    // Second read is on the build side, fourth on the probe side.
    for fail_at in [2, 4] {
        g.reset_stats();
        g.faults().fail_property_read_at.store(fail_at, Ordering::SeqCst);
        assert_storage_failure(g.query_plan(&plan, &Params::new()).unwrap_err());
        let stats = g.stats();
        assert_eq!(stats.leaked, 0);
        assert_eq!(stats.double_closes, 0);
        assert_eq!(stats.cursors_opened, stats.cursors_closed);
    }
}
