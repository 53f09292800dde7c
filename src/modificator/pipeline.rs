// src/modificator/pipeline.rs
//! Планировщик стадий.
//!
//! Зависимость `A` стадии `S` даёт ребро `A → S`, постфункция `P` даёт
//! ребро `S → P`. Граф проверяется на циклы, затем стадии выполняются волнами:
//! в волну попадают все стадии, чьи предшественники уже завершены. Внутри
//! волны стадии независимы и при фиче `parallel` идут в пуле rayon.

use super::{Modificator, StageRef};
use crate::error::GenError;
use crate::map::RmgMap;
use log::debug;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

pub struct Pipeline {
    graph: DiGraph<StageRef, ()>,
    stages: BTreeMap<StageRef, Arc<dyn Modificator>>,
}

impl Pipeline {
    /// Собирает стадии всех зон и их порядковые ограничения
    pub fn build(map: &RmgMap) -> Result<Self, GenError> {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<StageRef, NodeIndex> = HashMap::new();
        let mut stages = BTreeMap::new();

        for zone in map.zones() {
            for stage in zone.stages().all() {
                let key = stage.stage_ref();
                nodes.insert(key, graph.add_node(key));
                stages.insert(key, stage);
            }
        }

        for (key, stage) in &stages {
            let deps = stage.init(map);
            let node = nodes[key];
            for dep in &deps.dependencies {
                if let Some(&from) = nodes.get(dep) {
                    graph.update_edge(from, node, ());
                }
            }
            for post in &deps.postfunctions {
                if let Some(&to) = nodes.get(post) {
                    graph.update_edge(node, to, ());
                }
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(GenError::DependencyCycle {
                stage: graph[cycle.node_id()].to_string(),
            });
        }

        debug!(
            "Pipeline: {} stages, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self { graph, stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Волны стадий, внутри волны по возрастанию адреса
    pub fn waves(&self) -> Vec<Vec<StageRef>> {
        let mut indegree: BTreeMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Incoming).count()))
            .collect();

        let mut ready: BTreeSet<StageRef> = indegree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&n, _)| self.graph[n])
            .collect();
        let index: HashMap<StageRef, NodeIndex> = self
            .graph
            .node_indices()
            .map(|n| (self.graph[n], n))
            .collect();

        let mut waves = Vec::new();
        while !ready.is_empty() {
            let wave: Vec<StageRef> = std::mem::take(&mut ready).into_iter().collect();
            for stage in &wave {
                for next in self.graph.neighbors_directed(index[stage], Direction::Outgoing) {
                    if let Some(d) = indegree.get_mut(&next) {
                        *d -= 1;
                        if *d == 0 {
                            ready.insert(self.graph[next]);
                        }
                    }
                }
            }
            waves.push(wave);
        }
        waves
    }

    /// Выполняет все стадии. Первая ошибка прерывает генерацию после
    /// завершения текущей волны.
    pub fn run(&self, map: &RmgMap) -> Result<(), GenError> {
        for (i, wave) in self.waves().into_iter().enumerate() {
            debug!("Wave {i}: {} stages", wave.len());
            let stages: Vec<&Arc<dyn Modificator>> =
                wave.iter().filter_map(|s| self.stages.get(s)).collect();

            #[cfg(feature = "parallel")]
            stages
                .par_iter()
                .map(|stage| stage.process(map))
                .collect::<Result<Vec<()>, GenError>>()?;

            #[cfg(not(feature = "parallel"))]
            for stage in stages {
                stage.process(map)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{Area, Tile};
    use crate::config::{WaterContent, WaterSettings};
    use crate::map::Terrain;
    use crate::modificator::{
        ConnectionsPlacer, ModificatorKind, ObjectManager, TownPlacer, WaterAdopter, WaterProxy,
        WaterRoutes,
    };
    use crate::object::ObjectTypeRegistry;
    use crate::zone::{Zone, ZoneType};

    fn map_with_stages() -> RmgMap {
        let mut map = RmgMap::new(
            4,
            2,
            1,
            WaterSettings::default(),
            WaterContent::Normal,
            ObjectTypeRegistry::default(),
        );
        let land: Area = [Tile::new(0, 0, 0), Tile::new(0, 1, 0)].into_iter().collect();
        let water: Area = map.all_tiles().filter(|t| t.x > 0).collect();
        let l = map.add_zone(Zone::new(1, ZoneType::Treasure, Terrain::Grass, 0).with_area(land, Tile::new(0, 0, 0)));
        let w = map.add_zone(Zone::new(2, ZoneType::Water, Terrain::Water, 0).with_area(water, Tile::new(2, 0, 0)));
        for zone in [&l, &w] {
            zone.attach(TownPlacer::new(zone.id()));
            zone.attach(ConnectionsPlacer::new(zone.id(), &[]));
            zone.attach(ObjectManager::new(zone.id()));
        }
        l.attach(WaterAdopter::new(1));
        w.attach(WaterProxy::new(2));
        w.attach(WaterRoutes::new(2));
        map
    }

    fn position(waves: &[Vec<StageRef>], zone: u32, kind: ModificatorKind) -> usize {
        waves
            .iter()
            .position(|w| w.contains(&StageRef { zone, kind }))
            .unwrap()
    }

    #[test]
    fn water_stages_are_ordered() {
        let map = map_with_stages();
        let pipeline = Pipeline::build(&map).unwrap();
        assert_eq!(pipeline.len(), 9);
        let waves = pipeline.waves();
        assert_eq!(waves.iter().map(Vec::len).sum::<usize>(), 9);

        let proxy = position(&waves, 2, ModificatorKind::WaterProxy);
        let routes = position(&waves, 2, ModificatorKind::WaterRoutes);
        assert!(position(&waves, 1, ModificatorKind::WaterAdopter) < proxy);
        assert!(position(&waves, 1, ModificatorKind::TownPlacer) < proxy);
        assert!(proxy < position(&waves, 1, ModificatorKind::ConnectionsPlacer));
        assert!(position(&waves, 2, ModificatorKind::ConnectionsPlacer) < routes);
        assert!(routes < position(&waves, 1, ModificatorKind::ObjectManager));
        assert!(position(&waves, 1, ModificatorKind::ConnectionsPlacer) < position(&waves, 2, ModificatorKind::ConnectionsPlacer));
    }

    #[test]
    fn pipeline_runs_to_completion() {
        let map = map_with_stages();
        let pipeline = Pipeline::build(&map).unwrap();
        pipeline.run(&map).unwrap();
        let proxy = map.zone(2).unwrap().modificator::<WaterProxy>().unwrap();
        assert_eq!(proxy.lakes().len(), 1);
    }
}
