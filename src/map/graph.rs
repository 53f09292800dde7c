use crate::map::{RmgMap, ZoneId};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashMap, HashSet};

/// Граф соседства зон: ребро, если у зон есть общая сторона тайла
pub struct ZoneGraph {
    pub graph: UnGraph<ZoneId, ()>,
    nodes: HashMap<ZoneId, NodeIndex>,
}

impl ZoneGraph {
    pub fn build(map: &RmgMap) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut nodes = HashMap::new();
        for zone in map.zones() {
            nodes.insert(zone.id(), graph.add_node(zone.id()));
        }

        let mut edges = HashSet::new();
        for tile in map.all_tiles() {
            let Some(id) = map.zone_id(tile) else {
                continue;
            };
            // достаточно правого и нижнего соседа
            for n in [tile.offset(1, 0), tile.offset(0, 1)] {
                let Some(n_id) = map.zone_id(n) else {
                    continue;
                };
                if n_id == id {
                    continue;
                }
                let (a, b) = if id < n_id { (id, n_id) } else { (n_id, id) };
                if edges.insert((a, b)) {
                    if let (Some(&na), Some(&nb)) = (nodes.get(&a), nodes.get(&b)) {
                        graph.add_edge(na, nb, ());
                    }
                }
            }
        }

        Self { graph, nodes }
    }

    pub fn adjacent(&self, a: ZoneId, b: ZoneId) -> bool {
        match (self.nodes.get(&a), self.nodes.get(&b)) {
            (Some(&na), Some(&nb)) => self.graph.contains_edge(na, nb),
            _ => false,
        }
    }

    pub fn neighbours(&self, zone: ZoneId) -> Vec<ZoneId> {
        let Some(&node) = self.nodes.get(&zone) else {
            return Vec::new();
        };
        let mut result: Vec<ZoneId> = self.graph.neighbors(node).map(|n| self.graph[n]).collect();
        result.sort_unstable();
        result
    }
}

