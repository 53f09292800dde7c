use shoreline::modificator::connections::ConnectionKind;
use shoreline::{GeneratorConfig, MapGenerator, WaterContent};
use std::path::PathBuf;

fn load(name: &str) -> GeneratorConfig {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "maps", name].iter().collect();
    GeneratorConfig::from_toml_file(path).unwrap()
}

#[test]
fn strait_keeps_only_connected_coasts() {
    let config = load("strait.toml");
    assert_eq!(config.template.dimensions(), (27, 14, 1));

    let mut generator = MapGenerator::new(config).unwrap();
    let report = generator.generate().unwrap().clone();

    assert_eq!(report.lakes.len(), 1);
    let lake = &report.lakes[0];
    assert_eq!(lake.keep_connections.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(lake.neighbour_zones.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 5]);

    // соседние зоны получают и проход, и связь по воде
    let both = report.connections.iter().find(|c| c.zone_b == 3).unwrap();
    assert_eq!(both.kinds, vec![ConnectionKind::Direct, ConnectionKind::Water]);
    assert!(both.passage.is_some());

    assert!(!report.routes[&5].is_valid());
    let map = generator.map();
    let cut_off = map.zone(5).unwrap().area_possible();
    assert!(report.zones.iter().any(|z| z.id == 5));
    assert!(cut_off.iter().all(|t| t.x > 17));
}

#[test]
fn archipelago_spans_two_levels() {
    let config = load("archipelago.toml");
    assert_eq!(config.water_content, WaterContent::Islands);
    assert_eq!(config.template.dimensions(), (20, 14, 2));

    let mut generator = MapGenerator::new(config).unwrap();
    let report = generator.generate().unwrap().clone();

    // море и два озера на островах
    assert_eq!(report.lakes.len(), 3);
    let underground = report.connections.iter().find(|c| c.zone_b == 4).unwrap();
    assert_eq!(underground.kinds, vec![ConnectionKind::Monolith]);

    let dump = generator.text_dump();
    let levels: Vec<&str> = dump.split("\n\n").collect();
    assert_eq!(levels.len(), 2);
    assert!(levels[1].lines().all(|l| l.chars().count() == 20));
}
