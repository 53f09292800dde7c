use proptest::prelude::*;
use shoreline::map::Occupancy;
use shoreline::modificator::WaterProxy;
use shoreline::modificator::connections::ConnectionKind;
use shoreline::object::ObjectKind;
use shoreline::{
    Area, ConfigError, GenError, GeneratorConfig, MapGenerator, RouteInfo, Tile, ZoneType,
};

/// Карта `rows` строк: `land` столбцов зоны 1, `water` столбцов озера
/// (зона 3), `land` столбцов зоны 2.
fn strait(land: usize, water: usize, rows: usize, connected: bool, extra: &str) -> String {
    let row = format!("{}{}{}", "1".repeat(land), "3".repeat(water), "2".repeat(land));
    let zones = vec![format!("\"{row}\""); rows].join(", ");
    let connection = if connected {
        "[[template.connections]]\nzone_a = 1\nzone_b = 2\n"
    } else {
        ""
    };
    format!(
        r#"
seed = 11
{extra}

[[template.zones]]
id = 1
type = "player_start"

[[template.zones]]
id = 2
type = "treasure"

[[template.zones]]
id = 3
type = "water"
terrain = "water"

{connection}

[[template.levels]]
zones = [{zones}]
"#
    )
}

fn generator(toml: &str) -> MapGenerator {
    let config = GeneratorConfig::from_toml_str(toml).unwrap();
    MapGenerator::new(config).unwrap()
}

fn proxy(generator: &MapGenerator) -> std::sync::Arc<WaterProxy> {
    generator
        .map()
        .zone(3)
        .unwrap()
        .modificator::<WaterProxy>()
        .unwrap()
}

fn lake_border(generator: &MapGenerator, zone: u32) -> Area {
    proxy(generator).lakes()[0].neighbour_zones[&zone].clone()
}

#[test]
fn unconnected_zones_are_cut_off_from_a_large_lake() {
    let mut generator = generator(&strait(8, 10, 10, false, ""));
    let report = generator.generate().unwrap().clone();

    assert_eq!(report.lakes.len(), 1);
    assert_eq!(report.lakes[0].tiles, 100);
    assert!(report.lakes[0].keep_connections.is_empty());
    assert!(report.routes.values().all(|r| *r == RouteInfo::default()));
    assert!(report.objects.is_empty());

    let map = generator.map();
    for id in [1, 2] {
        let border = lake_border(&generator, id);
        assert_eq!(border.len(), 10);
        let zone = map.zone(id).unwrap();
        assert!(!zone.area_possible().overlap(&border));
        assert!(border.iter().all(|t| map.occupancy(t) != Some(Occupancy::Possible)));
    }

    let dump = generator.text_dump();
    let first_row = dump.lines().next().unwrap();
    assert_eq!(&first_row[7..9], "1~");
    assert_eq!(&first_row[17..19], "~2");
}

#[test]
fn connected_zones_get_maritime_routes() {
    let mut generator = generator(&strait(8, 6, 10, true, ""));
    let report = generator.generate().unwrap().clone();

    assert_eq!(report.connections.len(), 1);
    assert_eq!(report.connections[0].kinds, vec![ConnectionKind::Water]);
    assert_eq!(
        report.lakes[0].keep_connections.iter().copied().collect::<Vec<_>>(),
        vec![1, 2]
    );

    let lake = proxy(&generator).lakes()[0].area.clone();
    let map = generator.map();
    for id in [1, 2] {
        let route = &report.routes[&id];
        assert!(route.is_valid(), "zone {id} has no route");
        let boarding = route.boarding.unwrap();
        assert_eq!(map.zone_id(boarding), Some(id));
        assert!(!route.water.is_empty());
        assert!(lake.contains_all(&route.water));
        assert!(route.water.iter().all(|t| t.dist_sqr(boarding) <= 2));
        assert!(route.blocked.contains(route.visitable.unwrap()));
        assert!(report
            .objects
            .iter()
            .any(|p| p.object.visitable_position() == route.visitable.unwrap()));
    }

    // стартовая зона получает верфь, если для неё нашлось место
    let start = &report.routes[&1];
    let kind = report
        .objects
        .iter()
        .find(|p| p.object.visitable_position() == start.visitable.unwrap())
        .map(|p| p.object.instance.kind)
        .unwrap();
    assert!(matches!(kind, ObjectKind::Shipyard | ObjectKind::Boat));
    if kind == ObjectKind::Shipyard {
        assert!(start.blocked.len() >= 6);
        assert!(map.zone_id(start.visitable.unwrap()) == Some(1));
    }
}

#[test]
fn small_lake_is_kept_but_left_empty() {
    let mut generator = generator(&strait(8, 3, 8, true, ""));
    let report = generator.generate().unwrap().clone();

    assert_eq!(report.lakes.len(), 1);
    assert_eq!(report.lakes[0].tiles, 24);
    assert_eq!(report.connections[0].kinds, vec![ConnectionKind::Water]);
    assert!(report.routes.values().all(|r| !r.is_valid()));
    assert!(report.objects.is_empty());

    // берег не закрыт: связь по воде сохранена
    let map = generator.map();
    for id in [1, 2] {
        let border = lake_border(&generator, id);
        assert!(map.zone(id).unwrap().area_possible().overlap(&border));
    }
}

#[test]
fn painted_water_becomes_a_separate_lake() {
    let mut toml = strait(8, 4, 6, false, "");
    let terrain = (0..6)
        .map(|y| {
            if y == 2 {
                format!("\"..~~{}\"", ".".repeat(16))
            } else {
                format!("\"{}\"", ".".repeat(20))
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    toml.push_str(&format!("terrain = [{terrain}]\n"));

    let mut generator = generator(&toml);
    let report = generator.generate().unwrap().clone();
    assert_eq!(report.lakes.len(), 2);

    let map = generator.map();
    for x in [2, 3] {
        let tile = Tile::new(x, 2, 0);
        assert_eq!(map.zone_id(tile), Some(3));
        assert!(!map.zone(1).unwrap().area().contains(tile));
    }
    let pond = proxy(&generator).lake_of(Tile::new(2, 2, 0)).unwrap();
    let strait = proxy(&generator).lake_of(Tile::new(8, 0, 0)).unwrap();
    assert_ne!(pond, strait);
    assert_eq!(report.lakes[pond].tiles, 2);
}

#[test]
fn without_water_the_connection_falls_back_to_monoliths() {
    let mut generator = generator(&strait(8, 4, 10, true, "water_content = \"none\""));
    let report = generator.generate().unwrap().clone();

    assert!(report.lakes.is_empty());
    assert!(report.routes.is_empty());
    assert_eq!(report.connections[0].kinds, vec![ConnectionKind::Monolith]);

    let monoliths: Vec<_> = report
        .objects
        .iter()
        .filter(|p| p.object.instance.kind == ObjectKind::Monolith)
        .collect();
    assert_eq!(monoliths.len(), 2);
    assert_ne!(monoliths[0].zone, monoliths[1].zone);
    assert_eq!(monoliths[0].object.instance.subtype, monoliths[1].object.instance.subtype);
}

#[test]
fn second_water_zone_is_rejected() {
    let toml = strait(4, 2, 4, false, "").replace("type = \"treasure\"", "type = \"water\"\nterrain = \"water\"");
    let config = GeneratorConfig::from_toml_str(&toml).unwrap();
    assert!(matches!(
        MapGenerator::new(config),
        Err(GenError::Config(ConfigError::MultipleWaterZones))
    ));
}

#[test]
fn generation_is_deterministic() {
    let toml = strait(8, 4, 10, true, "");
    let mut a = generator(&toml);
    let mut b = generator(&toml);
    let ra = serde_json::to_string(a.generate().unwrap()).unwrap();
    let rb = serde_json::to_string(b.generate().unwrap()).unwrap();
    assert_eq!(ra, rb);
    assert_eq!(a.text_dump(), b.text_dump());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn zones_partition_the_map(seed in 0u64..1000, water in 3usize..7, connected in any::<bool>()) {
        let toml = strait(7, water, 8, connected, "").replace("seed = 11", &format!("seed = {seed}"));
        let mut generator = generator(&toml);
        generator.generate().unwrap();
        let map = generator.map();

        let mut covered = Area::new();
        for zone in map.zones() {
            let areas = zone.lock_areas();
            prop_assert!(!covered.overlap(&areas.area));
            prop_assert!(areas.area.contains_all(&areas.possible));
            prop_assert!(areas.area.contains_all(&areas.free));
            prop_assert!(!areas.possible.overlap(&areas.free));
            for tile in &areas.area {
                prop_assert_eq!(map.zone_id(tile), Some(zone.id()));
                if zone.zone_type() == ZoneType::Water {
                    prop_assert!(map.terrain(tile).is_some_and(|t| t.is_water()));
                }
            }
            covered.unite(&areas.area);
        }
        prop_assert_eq!(covered.len(), map.all_tiles().count());

        let water = map.zone(3).unwrap();
        let free = water.free_paths();
        for lake in proxy(&generator).lakes() {
            prop_assert!(lake.area.overlap(&free));
            for border in lake.neighbour_zones.values() {
                prop_assert!(!border.overlap(&lake.area));
            }
        }
    }
}
