use std::io::Write;

use backend::dataset::{DatasetError, TransitDataset, VisibleRoutes};
use backend::models::RouteNumber;
use proptest::prelude::*;
use shared::geo::find_nearest;
use tempfile::NamedTempFile;

const ROUTES: &str = include_str!("../data/routes.geojson");
const STOPS: &str = include_str!("../data/stops.geojson");

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_bundled_dataset_from_disk() {
    let routes = write_temp(ROUTES);
    let stops = write_temp(STOPS);

    let dataset = TransitDataset::from_files(routes.path(), stops.path()).unwrap();
    assert_eq!(
        dataset.route_numbers(),
        vec![RouteNumber(1), RouteNumber(40), RouteNumber(94)]
    );
    assert_eq!(dataset.stops().len(), 10);
    assert!(dataset
        .stops()
        .iter()
        .all(|stop| dataset.route(stop.route).is_some()));
}

#[test]
fn missing_file_is_an_io_error() {
    let stops = write_temp(STOPS);
    let err = TransitDataset::from_files("/nonexistent/routes.geojson", stops.path()).unwrap_err();
    assert!(matches!(err, DatasetError::Io(_)));
}

#[test]
fn truncated_file_is_a_parse_error() {
    let routes = write_temp(&ROUTES[..ROUTES.len() / 2]);
    let stops = write_temp(STOPS);
    let err = TransitDataset::from_files(routes.path(), stops.path()).unwrap_err();
    assert!(matches!(err, DatasetError::Parse(_)));
}

#[test]
fn airport_stop_is_nearest_to_the_trip_origin() {
    let dataset = TransitDataset::from_readers(ROUTES.as_bytes(), STOPS.as_bytes()).unwrap();
    let origin = backend::models::GeoPoint::new(36.6, -121.8);
    let nearest = find_nearest(&origin, dataset.stops()).unwrap();
    assert_eq!(nearest.name, "Monterey Regional Airport");
    assert_eq!(nearest.route, RouteNumber(94));
}

proptest! {
    #[test]
    fn visible_route_lists_round_trip(numbers in proptest::collection::btree_set(0u32..500, 0..10)) {
        let raw = numbers
            .iter()
            .map(|n| format!(" {n} "))
            .collect::<Vec<_>>()
            .join(",");
        let visible = VisibleRoutes::parse(Some(&raw)).unwrap();
        for n in 0u32..500 {
            prop_assert_eq!(visible.contains(RouteNumber(n)), numbers.contains(&n));
        }
    }

    #[test]
    fn visible_route_lists_reject_words(word in "[a-z]{1,8}") {
        let raw = ["1", word.as_str()].join(",");
        prop_assert!(VisibleRoutes::parse(Some(&raw)).is_err());
    }
}
