use std::collections::BTreeSet;

use quakestack_domain::{LogicalId, ResourceEdge, ResourceGraph};

use crate::error::GraphError;

/// Order in which the graph's resources must be created.
///
/// # Errors
///
/// Returns an error when an edge references a node outside the graph or when
/// the edges form a cycle.
pub fn creation_order(graph: &ResourceGraph) -> std::result::Result<Vec<LogicalId>, GraphError> {
    let nodes: Vec<LogicalId> = graph.nodes().into_iter().map(|node| node.id).collect();
    order_nodes(&nodes, &graph.edges())
}

/// Order in which the graph's resources must be destroyed; the reverse of
/// [`creation_order`].
///
/// # Errors
///
/// Same conditions as [`creation_order`].
pub fn teardown_order(graph: &ResourceGraph) -> std::result::Result<Vec<LogicalId>, GraphError> {
    let mut order = creation_order(graph)?;
    order.reverse();
    Ok(order)
}

/// Repeatedly places the lexically smallest resource whose predecessors are
/// all placed, so equal graphs always yield equal orders.
fn order_nodes(
    nodes: &[LogicalId],
    edges: &[ResourceEdge],
) -> std::result::Result<Vec<LogicalId>, GraphError> {
    let mut pending: BTreeSet<&LogicalId> = nodes.iter().collect();

    if let Some(edge) = edges
        .iter()
        .find(|edge| !pending.contains(&edge.from) || !pending.contains(&edge.to))
    {
        return Err(GraphError::DanglingEdge {
            from: edge.from.clone(),
            to: edge.to.clone(),
        });
    }

    let mut order = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending.iter().copied().find(|id| {
            edges
                .iter()
                .all(|edge| &edge.to != *id || !pending.contains(&edge.from))
        });
        let Some(next) = ready else {
            let blocked: Vec<&str> = pending.iter().map(|id| id.as_str()).collect();
            return Err(GraphError::CycleDetected {
                resources: blocked.join(", "),
            });
        };
        pending.remove(next);
        order.push(next.clone());
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use quakestack_domain::{
        ArtifactRef, EdgeKind, LogicalId, ResourceEdge, ResourceGraph, SecretValue,
    };

    use super::{creation_order, order_nodes, teardown_order};
    use crate::builder::{build, default_observability_layer};
    use crate::error::GraphError;

    fn graph() -> ResourceGraph {
        build(
            "earthquake-trends-main-lambda",
            &SecretValue::from("abc123"),
            &ArtifactRef::new("../rust_lambda/Cargo.toml", "bootstrap"),
            &default_observability_layer(),
        )
    }

    fn id(value: &str) -> LogicalId {
        LogicalId::try_from(value).expect("valid logical id")
    }

    fn edge(from: &str, to: &str) -> ResourceEdge {
        ResourceEdge {
            from: id(from),
            to: id(to),
            kind: EdgeKind::AttachedTo,
        }
    }

    #[test]
    fn creates_layer_then_function_then_api() {
        let order = creation_order(&graph()).expect("order");
        assert_eq!(
            order,
            vec![
                id("DatadogLayer"),
                id("EarthquakeTrendsFunction"),
                id("EarthquakeTrendsApi"),
            ]
        );
    }

    #[test]
    fn tears_down_api_before_function() {
        let order = teardown_order(&graph()).expect("order");
        let api = order
            .iter()
            .position(|node| node.as_str() == "EarthquakeTrendsApi")
            .expect("api present");
        let function = order
            .iter()
            .position(|node| node.as_str() == "EarthquakeTrendsFunction")
            .expect("function present");
        assert!(api < function);
    }

    #[test]
    fn rejects_handler_outside_graph() {
        let mut broken = graph();
        broken.api.handler = id("SomeOtherFunction");
        let error = creation_order(&broken).expect_err("must fail");
        assert!(matches!(error, GraphError::DanglingEdge { .. }));
        assert!(error.to_string().contains("SomeOtherFunction"));
    }

    #[test]
    fn detects_cycle() {
        let nodes = [id("A"), id("B")];
        let error = order_nodes(&nodes, &[edge("A", "B"), edge("B", "A")]).expect_err("cycle");
        assert!(error.to_string().contains("cycle"));
        assert!(error.to_string().contains("A, B"));
    }

    #[test]
    fn self_referencing_edge_is_a_cycle() {
        let nodes = [id("A")];
        let error = order_nodes(&nodes, &[edge("A", "A")]).expect_err("cycle");
        assert!(matches!(error, GraphError::CycleDetected { .. }));
    }

    #[test]
    fn dependents_wait_for_every_predecessor() {
        let nodes = [id("Api"), id("Function"), id("Layer")];
        let edges = [edge("Layer", "Function"), edge("Function", "Api")];
        let order = order_nodes(&nodes, &edges).expect("order");
        assert_eq!(order, vec![id("Layer"), id("Function"), id("Api")]);
    }

    #[test]
    fn independent_nodes_order_lexically() {
        let nodes = [id("Zeta"), id("Alpha"), id("Mid")];
        let order = order_nodes(&nodes, &[]).expect("order");
        assert_eq!(order, vec![id("Alpha"), id("Mid"), id("Zeta")]);
    }
}
