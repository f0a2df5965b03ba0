use crate::control::actuator::ActuatorController;
use crate::core::cpg::{CpgError, OscillatorNetwork};
use crate::core::edges::EdgeTable;
use tracing::debug;

struct Links {
    node: usize,
    neighbors: Vec<usize>,
    weights: Vec<f64>,
    phases: Vec<f64>,
}

fn links_for(
    index: usize,
    controllers: &[ActuatorController],
    edges: &EdgeTable,
) -> Result<Links, CpgError> {
    let me = &controllers[index];
    let Some(node) = me.node() else {
        panic!("actuator {} connected before node assignment", me.actuator_index());
    };
    let mut links = Links {
        node,
        neighbors: Vec::new(),
        weights: Vec::new(),
        phases: Vec::new(),
    };
    for (j, other) in controllers.iter().enumerate() {
        if j == index || !me.shares_body(other) {
            continue;
        }
        let Some(theirs) = other.node() else {
            panic!("actuator {} has no node", other.actuator_index());
        };
        let edge = edges.get(node, theirs).ok_or(CpgError::UnknownNode(theirs))?;
        links.neighbors.push(theirs);
        links.weights.push(edge.weight);
        links.phases.push(edge.phase);
    }
    Ok(links)
}

/// Couples every pair of controllers whose cables share a body.
///
/// Each controller's node gets one directed link per eligible peer, with
/// weight and phase bias from `edges` (looked up by node index, so `i -> j`
/// and `j -> i` read the same entry). Returns the number of directed links.
///
/// # Panics
/// Panics if a controller is unattached or has no node.
pub fn connect_all(
    network: &mut OscillatorNetwork,
    controllers: &mut [ActuatorController],
    edges: &EdgeTable,
) -> Result<usize, CpgError> {
    let all = (0..controllers.len())
        .map(|i| links_for(i, controllers, edges))
        .collect::<Result<Vec<_>, _>>()?;

    let mut total = 0;
    for links in &all {
        network.define_connections(links.node, &links.neighbors, &links.weights, &links.phases)?;
        total += links.neighbors.len();
    }
    for controller in controllers.iter_mut() {
        controller.mark_connected();
    }
    debug!(
        nodes = controllers.len(),
        links = total,
        "oscillator network connected"
    );
    Ok(total)
}
