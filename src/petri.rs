mod coverability;
mod marking;
mod net;

pub use coverability::{explore, CoverabilityNode, CoverabilityTree, NodeId, NodeKind};
pub use marking::{InitialMarking, Marking, MarkingParseError, Tokens};
pub use net::{
    build, build_with, check_shape_with, is_petri_net, PetriNet, PlaceId, ShapeError, Transition,
    TransitionId,
};

use tracing::{debug, error};

use crate::{
    graph::{Conventions, Graph},
    Failure,
};

/// Reads the net drawn in `graph`, parses `initial` as its initial marking (see
/// [`InitialMarking`]) and builds the coverability tree, using the default [`Conventions`].
pub fn cover(graph: &Graph, initial: &str) -> Result<CoverabilityTree, Failure> {
    let initial: InitialMarking = initial.parse().map_err(|e| {
        error!("cannot build coverability tree, {e}");
        Failure::from(e)
    })?;
    Ok(cover_with(graph, &initial, &Conventions::default()))
}

/// Reads the net drawn in `graph` according to `conventions` and builds its coverability
/// tree from `initial`.
pub fn cover_with(
    graph: &Graph,
    initial: &InitialMarking,
    conventions: &Conventions,
) -> CoverabilityTree {
    let net = build_with(graph, conventions);
    let marking = initial.for_net(&net);
    debug!("exploring from initial marking {:?}", marking);
    explore(&net, &marking)
}

#[cfg(test)]
mod tests {
    use crate::{prelude::*, tests::producer_consumer_graph};

    #[test_log::test]
    fn cover_reads_marking() {
        let tree = cover(&producer_consumer_graph(), "p1=1, p9=4").unwrap();
        assert_eq!(
            tree.node(tree.root()).unwrap().marking(),
            &Marking::new([1u64, 0, 0].map(Tokens::from))
        );
        assert!(tree.is_bounded());
        assert_eq!(tree.size(), 4);
    }

    #[test]
    fn cover_rejects_malformed_marking() {
        assert!(matches!(
            cover(&producer_consumer_graph(), "p1=x"),
            Err(Failure::Marking(MarkingParseError::InvalidCount { .. }))
        ));
    }
}
