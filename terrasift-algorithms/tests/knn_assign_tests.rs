use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;
use terrasift_algorithms::{
    filter::{create_filter, Filter},
    knn_assign::{KnnAssignFilter, KnnAssignOptions},
};
use terrasift_core::{
    containers::PointSet,
    error::ConfigurationError,
    layout::{dimensions, DimensionDataType, PointLayout},
};
use terrasift_io::{ascii::AsciiReader, base::PointSetLoader};

fn get_test_file_path(filename: &str) -> PathBuf {
    let mut test_file_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    test_file_path.push(format!("resources/test/{}", filename));
    test_file_path
}

fn points_from(coordinates_and_classes: &[([f64; 3], f64)]) -> PointSet {
    let mut points = PointSet::with_len(
        PointLayout::xyz_classification(),
        coordinates_and_classes.len(),
    );
    for (id, (position, class)) in coordinates_and_classes.iter().enumerate() {
        points.set_field(dimensions::X.id(), id, position[0]).unwrap();
        points.set_field(dimensions::Y.id(), id, position[1]).unwrap();
        points.set_field(dimensions::Z.id(), id, position[2]).unwrap();
        points
            .set_field(dimensions::CLASSIFICATION.id(), id, *class)
            .unwrap();
    }
    points
}

/// A point of class `center` surrounded by four close points of class `surrounding`, at `offset` along X
fn cluster(offset: f64, center: f64, surrounding: f64) -> Vec<([f64; 3], f64)> {
    vec![
        ([offset, 0.0, 0.0], center),
        ([offset + 0.1, 0.0, 0.0], surrounding),
        ([offset - 0.1, 0.0, 0.0], surrounding),
        ([offset, 0.1, 0.0], surrounding),
        ([offset, -0.1, 0.0], surrounding),
    ]
}

fn run_knn(options: KnnAssignOptions, points: PointSet) -> Result<PointSet> {
    let mut filter = KnnAssignFilter::new(options)?;
    let mut output = filter.execute(points)?;
    assert_eq!(1, output.len());
    Ok(output.remove(0))
}

fn with_k(k: usize) -> KnnAssignOptions {
    KnnAssignOptions {
        k: Some(k),
        ..Default::default()
    }
}

#[test]
fn point_count_never_changes() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(3);
    let points = points_from(
        &(0..500)
            .map(|_| {
                (
                    [
                        rng.gen_range(0.0..20.0),
                        rng.gen_range(0.0..20.0),
                        rng.gen_range(0.0..5.0),
                    ],
                    rng.gen_range(0..4u8) as f64,
                )
            })
            .collect::<Vec<_>>(),
    );
    for k in [1, 4, 9] {
        let result = run_knn(with_k(k), points.clone())?;
        assert_eq!(points.len(), result.len());
        assert_eq!(
            points.field_values(dimensions::X.id()),
            result.field_values(dimensions::X.id())
        );
    }
    Ok(())
}

#[test]
fn k_equal_one_changes_nothing_in_self_mode() -> Result<()> {
    let points = points_from(&cluster(0.0, 1.0, 7.0));
    let result = run_knn(with_k(1), points.clone())?;
    assert_eq!(points, result);
    Ok(())
}

#[test]
fn even_split_is_not_a_majority() -> Result<()> {
    let points = points_from(&[
        ([0.0, 0.0, 0.0], 2.0),
        ([1.0, 0.0, 0.0], 2.0),
        ([0.0, 1.0, 0.0], 5.0),
        ([1.0, 1.0, 0.0], 5.0),
    ]);
    let result = run_knn(with_k(4), points.clone())?;
    assert_eq!(points, result);
    Ok(())
}

#[test]
fn majority_overwrites_outlier() -> Result<()> {
    let points = points_from(&cluster(0.0, 1.0, 7.0));
    let result = run_knn(with_k(5), points)?;
    assert!(result
        .field_values(dimensions::CLASSIFICATION.id())
        .iter()
        .all(|c| *c == 7.0));
    Ok(())
}

#[test]
fn domain_restricts_reclassified_points() -> Result<()> {
    let mut coordinates = cluster(0.0, 1.0, 7.0);
    coordinates.extend(cluster(100.0, 5.0, 7.0));
    let points = points_from(&coordinates);

    let options = KnnAssignOptions {
        k: Some(5),
        domain: vec!["Classification[5,6)".into()],
        ..Default::default()
    };
    let result = run_knn(options, points.clone())?;
    // Class 1 is outside of the domain, class 5 is inside
    assert_eq!(1.0, result.get_field(dimensions::CLASSIFICATION.id(), 0));
    assert_eq!(7.0, result.get_field(dimensions::CLASSIFICATION.id(), 5));

    let result = run_knn(with_k(5), points)?;
    assert_eq!(7.0, result.get_field(dimensions::CLASSIFICATION.id(), 0));
    assert_eq!(7.0, result.get_field(dimensions::CLASSIFICATION.id(), 5));
    Ok(())
}

#[test]
fn any_passing_range_makes_point_eligible() -> Result<()> {
    let mut coordinates = cluster(0.0, 1.0, 7.0);
    coordinates.extend(cluster(50.0, 3.0, 7.0));
    coordinates.extend(cluster(100.0, 4.0, 7.0));
    let options = KnnAssignOptions {
        k: Some(5),
        domain: vec!["Classification[4]".into(), "Classification[1:1]".into()],
        ..Default::default()
    };
    let result = run_knn(options, points_from(&coordinates))?;
    assert_eq!(7.0, result.get_field(dimensions::CLASSIFICATION.id(), 0));
    assert_eq!(3.0, result.get_field(dimensions::CLASSIFICATION.id(), 5));
    assert_eq!(7.0, result.get_field(dimensions::CLASSIFICATION.id(), 10));
    Ok(())
}

#[test]
fn votes_read_values_from_before_the_run() -> Result<()> {
    // Point 1 keeps its class because its neighbor 0 still votes with its old class
    let points = points_from(&[
        ([0.0, 0.0, 0.0], 1.0),
        ([1.0, 0.0, 0.0], 1.0),
        ([-0.5, 0.0, 0.0], 2.0),
        ([2.0, 0.0, 0.0], 2.0),
        ([0.0, 0.5, 0.0], 2.0),
        ([3.0, 0.0, 0.0], 2.0),
    ]);
    let result = run_knn(with_k(3), points)?;
    assert_eq!(
        vec![2.0, 1.0, 2.0, 2.0, 2.0, 2.0],
        result.field_values(dimensions::CLASSIFICATION.id())
    );
    Ok(())
}

#[test]
fn candidate_file_is_the_reference() -> Result<()> {
    let path = get_test_file_path("candidates.txt");
    let mut filter = create_filter(
        "filters.knnassign",
        &json!({ "k": 3, "candidate": path.to_str().unwrap() }),
    )?;
    let points = points_from(
        &(0..10)
            .map(|i| ([i as f64 + 0.1, 0.2, 0.0], 2.0))
            .collect::<Vec<_>>(),
    );
    let result = filter.execute(points)?.remove(0);
    assert!(result
        .field_values(dimensions::CLASSIFICATION.id())
        .iter()
        .all(|c| *c == 6.0));
    Ok(())
}

#[test]
fn missing_candidate_file_fails() {
    let options = KnnAssignOptions {
        k: Some(3),
        candidate: get_test_file_path("no_such_file.txt")
            .to_string_lossy()
            .into_owned(),
        ..Default::default()
    };
    assert!(run_knn(options, points_from(&cluster(0.0, 1.0, 2.0))).is_err());
}

#[test]
fn candidate_set_is_loaded_once() -> Result<()> {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let loader = move |name: &str| -> Result<PointSet> {
        counter.fetch_add(1, Ordering::SeqCst);
        if name != "far-away-reference" {
            bail!("Unknown point set {}", name);
        }
        Ok(points_from(&cluster(0.0, 9.0, 4.0)))
    };
    let options = KnnAssignOptions {
        k: Some(5),
        candidate: "far-away-reference".into(),
        ..Default::default()
    };
    let mut filter = KnnAssignFilter::new(options)?.with_loader(loader);

    let points = points_from(&cluster(1000.0, 1.0, 1.0));
    for _ in 0..3 {
        let result = filter.execute(points.clone())?.remove(0);
        assert!(result
            .field_values(dimensions::CLASSIFICATION.id())
            .iter()
            .all(|c| *c == 4.0));
    }
    assert_eq!(1, loads.load(Ordering::SeqCst));
    Ok(())
}

struct AsciiStringLoader(&'static str);

impl PointSetLoader for AsciiStringLoader {
    fn load(&self, _name: &str) -> Result<PointSet> {
        AsciiReader::from_read(self.0.as_bytes(), "xyzsc", " ")?.read_all()
    }
}

#[test]
fn candidate_layout_may_differ_from_input() -> Result<()> {
    let loader = AsciiStringLoader("0 0 0 17 6\n0.5 0 0 18 6\n1 0 0 19 2\n");
    let options = KnnAssignOptions {
        k: Some(3),
        candidate: "inline".into(),
        ..Default::default()
    };
    let mut filter = KnnAssignFilter::new(options)?.with_loader(loader);

    let mut layout = PointLayout::xyz_classification();
    layout.register_dim(&dimensions::INTENSITY);
    let mut points = PointSet::with_len(layout, 2);
    points.set_field(dimensions::X.id(), 1, 0.5)?;
    let result = filter.execute(points)?.remove(0);
    assert_eq!(
        vec![6.0, 6.0],
        result.field_values(dimensions::CLASSIFICATION.id())
    );
    Ok(())
}

#[test]
fn custom_voting_dimension() -> Result<()> {
    let mut layout = PointLayout::xyz_classification();
    let confidence = layout.register_custom("Confidence", DimensionDataType::F32);
    let mut points = points_from(&cluster(0.0, 1.0, 1.0));
    let mut with_confidence = PointSet::with_len(layout, points.len());
    for id in 0..points.len() {
        for dimension in [dimensions::X, dimensions::Y, dimensions::Z] {
            with_confidence.set_field(dimension.id(), id, points.get_field(dimension.id(), id))?;
        }
        with_confidence.set_field(confidence, id, if id == 0 { 0.25 } else { 0.75 })?;
    }
    points = with_confidence;

    let options = KnnAssignOptions {
        k: Some(5),
        dimension: "confidence".into(),
        ..Default::default()
    };
    let result = run_knn(options, points)?;
    assert_eq!(vec![0.75; 5], result.field_values(confidence));
    assert_eq!(vec![0.0; 5], result.field_values(dimensions::CLASSIFICATION.id()));
    Ok(())
}

#[test]
fn invalid_options_are_configuration_errors() {
    for options in [
        json!({}),
        json!({ "k": 0 }),
        json!({ "k": -2 }),
        json!({ "k": 3, "domain": ["Classification[2:1]"] }),
        json!({ "k": 3, "domain": "Classification[2:3]" }),
        json!({ "k": 3, "neighbours": 5 }),
    ] {
        let error = create_filter("filters.knnassign", &options).err().unwrap();
        assert!(
            error.downcast_ref::<ConfigurationError>().is_some(),
            "Expected a configuration error for {}",
            options
        );
    }
}

#[test]
fn unknown_domain_dimension_fails_in_prepare() {
    let options = KnnAssignOptions {
        k: Some(3),
        domain: vec!["Classification[1:2]".into(), "GpsTime>100".into()],
        ..Default::default()
    };
    let mut filter = KnnAssignFilter::new(options).unwrap();
    let points = points_from(&cluster(0.0, 1.0, 2.0));
    let error = filter.execute(points).unwrap_err();
    assert_eq!(
        Some(&ConfigurationError::unknown_dimension("domain", "GpsTime")),
        error.downcast_ref::<ConfigurationError>()
    );
}
