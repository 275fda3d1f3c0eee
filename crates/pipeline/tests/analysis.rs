//! End-to-end runs on small synthetic scenes

use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use floodscope_algorithms::hydrology::{condition_dem, ConditioningParams};
use floodscope_core::io::{read_geojson, read_geotiff, write_geojson, write_geotiff};
use floodscope_core::raster::d8::{self, downstream};
use floodscope_core::vector::{Feature, FeatureCollection};
use floodscope_core::{GeoTransform, Mask, Raster, CRS};
use floodscope_pipeline::{
    run_analysis, run_analysis_with, AnalysisConfig, AnalysisInputs, AnalysisStatus,
    PermanentWaterSource, Severity, Stage,
};
use geo_types::{LineString, Polygon};
use tempfile::TempDir;

const ROWS: usize = 40;
const COLS: usize = 40;
const PIXEL: f64 = 30.0;
const ORIGIN: (f64, f64) = (500_000.0, 4_000_000.0);

fn utm() -> CRS {
    CRS::from_epsg(32630)
}

/// Interior cells of a flow-direction grid that drain nowhere
fn interior_pits(flow_direction: &Raster<u8>) -> usize {
    let (rows, cols) = flow_direction.shape();
    (1..rows - 1)
        .flat_map(|r| (1..cols - 1).map(move |c| (r, c)))
        .filter(|&(r, c)| flow_direction.get(r, c).unwrap() == d8::PIT)
        .count()
}

fn write_band<F>(dir: &Path, name: &str, origin: (f64, f64), shape: (usize, usize), crs: CRS, f: F) -> PathBuf
where
    F: Fn(usize, usize) -> f64,
{
    write_band_at(dir, name, origin, shape, PIXEL, crs, f)
}

fn write_band_at<F>(
    dir: &Path,
    name: &str,
    origin: (f64, f64),
    shape: (usize, usize),
    pixel: f64,
    crs: CRS,
    f: F,
) -> PathBuf
where
    F: Fn(usize, usize) -> f64,
{
    let (rows, cols) = shape;
    let values = (0..rows).flat_map(|r| (0..cols).map(move |c| (r, c))).map(|(r, c)| f(r, c)).collect();
    let mut raster = Raster::from_vec(values, rows, cols).unwrap();
    raster.set_transform(GeoTransform::new(origin.0, origin.1, pixel, -pixel));
    raster.set_crs(Some(crs));
    let path = dir.join(format!("{}.tif", name));
    write_geotiff(&raster, &path).unwrap();
    path
}

/// Scene with a westward-draining DEM and the given spectral bands
struct Scene {
    dir: TempDir,
    inputs: AnalysisInputs,
}

impl Scene {
    fn new<G, S>(green: G, swir: S) -> Self
    where
        G: Fn(usize, usize) -> f64,
        S: Fn(usize, usize) -> f64,
    {
        let dir = tempfile::tempdir().unwrap();
        let dem = write_band(dir.path(), "dem", ORIGIN, (ROWS, COLS), utm(), |_, c| 10.0 + c as f64);
        Self::with_dem(dir, dem, green, swir)
    }

    fn with_dem<G, S>(dir: TempDir, dem: PathBuf, green: G, swir: S) -> Self
    where
        G: Fn(usize, usize) -> f64,
        S: Fn(usize, usize) -> f64,
    {
        let green = write_band(dir.path(), "green", ORIGIN, (ROWS, COLS), utm(), green);
        let swir = write_band(dir.path(), "swir", ORIGIN, (ROWS, COLS), utm(), swir);
        let inputs = AnalysisInputs {
            id: "7".into(),
            name: "test scene".into(),
            dem,
            green,
            swir,
            output_dir: dir.path().join("out"),
        };
        Self { dir, inputs }
    }

    fn vector_layer(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> PathBuf {
        let mut fc = FeatureCollection::with_crs(utm());
        fc.push(Feature::new(Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )));
        let path = self.dir.path().join("permanent.geojson");
        write_geojson(&fc, &path).unwrap();
        path
    }
}

fn mask(path: &Path) -> Mask {
    read_geotiff(path).unwrap()
}

/// Water on the western half: green flat, SWIR ten times brighter in the east
fn west_half_water(_: usize, c: usize) -> f64 {
    if c < COLS / 2 {
        0.1
    } else {
        1.0
    }
}

fn config(permanent_water: PermanentWaterSource) -> AnalysisConfig {
    AnalysisConfig {
        permanent_water,
        min_polygon_pixels: 1,
        ..Default::default()
    }
}

#[test]
fn depression_is_filled_and_drains_to_edge() {
    let dir = tempfile::tempdir().unwrap();
    let pit = (10, 10);
    let dem = write_band(dir.path(), "dem", ORIGIN, (20, 20), utm(), |r, c| {
        if (r, c) == pit {
            0.0
        } else {
            10.0 + c as f64
        }
    });
    let scene = Scene::with_dem(dir, dem.clone(), |_, _| 1.0, |_, _| 1.0);
    let cfg = AnalysisConfig {
        write_filled_dem: true,
        ..config(PermanentWaterSource::Accumulation { threshold: 5 })
    };

    let result = run_analysis(&scene.inputs, &cfg);
    assert_eq!(result.status, AnalysisStatus::Completed, "{:?}", result.error_message);

    let filled: Raster<f64> = read_geotiff(&result.artifacts.filled_dem).unwrap();
    assert!(filled.get(pit.0, pit.1).unwrap() >= 19.0 - 1e-3, "pit raised to its spill level");
    for r in 1..19 {
        for c in 1..19 {
            let z = filled.get(r, c).unwrap();
            let lowest = d8::OFFSETS[1..]
                .iter()
                .map(|&(dr, dc)| filled.get((r as isize + dr) as usize, (c as isize + dc) as usize).unwrap())
                .fold(f64::INFINITY, f64::min);
            assert!(lowest <= z + 1e-3, "interior minimum left at ({}, {})", r, c);
        }
    }

    // Follow D8 from the former pit: never climbs, ends on the border
    let raw: Raster<f64> = read_geotiff(&dem).unwrap();
    let conditioned = condition_dem(&raw, &ConditioningParams::default()).unwrap();
    let (mut r, mut c) = pit;
    for _ in 0..400 {
        let dir = conditioned.flow_direction.get(r, c).unwrap();
        match downstream(r, c, dir, 20, 20) {
            Some((nr, nc)) => {
                let here = conditioned.filled.get(r, c).unwrap();
                let next = conditioned.filled.get(nr, nc).unwrap();
                assert!(next <= here, "flow path climbs at ({}, {})", nr, nc);
                r = nr;
                c = nc;
            }
            None => break,
        }
    }
    assert!(r == 0 || c == 0 || r == 19 || c == 19, "path stopped inside at ({}, {})", r, c);
}

#[test]
fn dark_bands_find_no_flood_water() {
    let scene = Scene::new(|_, _| 0.0, |_, _| 0.0);
    let layer = scene.vector_layer(ORIGIN.0 + 300.0, ORIGIN.1 - 600.0, ORIGIN.0 + 600.0, ORIGIN.1 - 300.0);

    let result = run_analysis(&scene.inputs, &config(PermanentWaterSource::Vector { path: layer }));
    assert_eq!(result.status, AnalysisStatus::Completed, "{:?}", result.error_message);

    assert!(mask(&result.artifacts.mndwi_mask).is_all_zero());
    assert_eq!(result.gained.num_polygons, 0);
    assert_eq!(result.gained.total_area_sqkm, 0.0);
    assert_eq!(result.persistent.num_polygons, 0);
    assert_eq!(result.lost.num_polygons, 1);
    assert_relative_eq!(result.lost.total_area_sqkm, 100.0 * 900.0 / 1e6, epsilon = 1e-9);
    assert_relative_eq!(result.flooded_area_sqkm, 0.0);
}

#[test]
fn vector_outside_extent_leaves_only_gained_water() {
    let scene = Scene::new(|_, _| 1.0, west_half_water);
    let far = scene.vector_layer(600_000.0, 3_000_000.0, 601_000.0, 3_001_000.0);

    let result = run_analysis(&scene.inputs, &config(PermanentWaterSource::Vector { path: far }));
    assert_eq!(result.status, AnalysisStatus::Completed, "{:?}", result.error_message);

    assert!(mask(&result.artifacts.permanent_water_vector).is_all_zero());
    assert_eq!(result.lost.num_polygons, 0);
    assert_eq!(result.persistent.num_polygons, 0);

    let spectral = mask(&result.artifacts.mndwi_mask);
    assert_eq!(spectral.count_ones(), ROWS * COLS / 2);
    assert_relative_eq!(
        result.gained.total_area_sqkm,
        spectral.count_ones() as f64 * PIXEL * PIXEL / 1e6,
        epsilon = 1e-9
    );
    assert!(result
        .events(Severity::Warning)
        .any(|e| e.stage == Stage::PermanentWater));

    let gained = read_geojson(&result.artifacts.only_mndwi).unwrap();
    assert_eq!(gained.len(), 1);
    assert_eq!(gained.crs_or_wgs84().epsg(), Some(4326));
    assert!(read_geojson(&result.artifacts.only_pw).unwrap().is_empty());
}

#[test]
fn all_water_scene_area_matches_pixel_count() {
    let scene = Scene::new(|_, _| 1.0, |_, _| 0.0);
    let cfg = config(PermanentWaterSource::Accumulation { threshold: 1_000_000 });

    let result = run_analysis(&scene.inputs, &cfg);
    assert_eq!(result.status, AnalysisStatus::Completed, "{:?}", result.error_message);

    let expected = (ROWS * COLS) as f64 * PIXEL * PIXEL / 1e6;
    assert_eq!(result.gained.num_polygons, 1);
    assert_relative_eq!(result.gained.total_area_sqkm, expected, epsilon = 1e-9);
    assert_relative_eq!(result.flooded_area_sqkm, expected, epsilon = 1e-9);

    let agreement = result.agreement.unwrap();
    assert_eq!(agreement.intersection, 0);
    assert_eq!(agreement.false_positives, ROWS * COLS);
}

#[test]
fn classes_are_disjoint_and_cover_both_masks() {
    let scene = Scene::new(|_, _| 1.0, west_half_water);
    // Permanent water over the top half
    let layer = scene.vector_layer(ORIGIN.0, ORIGIN.1 - PIXEL * 20.0, ORIGIN.0 + PIXEL * 40.0, ORIGIN.1);
    let cfg = AnalysisConfig {
        write_difference_map: true,
        ..config(PermanentWaterSource::Vector { path: layer })
    };

    let result = run_analysis(&scene.inputs, &cfg);
    assert_eq!(result.status, AnalysisStatus::Completed, "{:?}", result.error_message);

    let quarter = (ROWS * COLS / 4) as f64 * PIXEL * PIXEL / 1e6;
    assert_relative_eq!(result.persistent.total_area_sqkm, quarter, epsilon = 1e-9);
    assert_relative_eq!(result.lost.total_area_sqkm, quarter, epsilon = 1e-9);
    assert_relative_eq!(result.gained.total_area_sqkm, quarter, epsilon = 1e-9);

    let diff = mask(&result.artifacts.difference_map);
    let counts = [0u8, 1, 2].map(|v| diff.data().iter().filter(|&&x| x == v).count());
    assert_eq!(counts, [800, 400, 400]);

    let agreement = result.agreement.unwrap();
    assert_eq!(agreement.intersection, 400);
    assert_eq!(agreement.union, 1200);
    assert_relative_eq!(agreement.iou, 1.0 / 3.0, epsilon = 1e-12);

    assert!(result.artifacts.map_png.exists());
    let bounds = result.map_bounds.unwrap();
    assert!(bounds.west < bounds.east && bounds.south < bounds.north);
    assert!(bounds.west > -3.1 && bounds.east < -2.9, "UTM 30N near its central meridian");
}

#[test]
fn accumulation_mask_is_reproducible() {
    let scene = Scene::new(|_, _| 1.0, west_half_water);
    let cfg = config(PermanentWaterSource::Accumulation { threshold: 30 });

    let first = run_analysis(&scene.inputs, &cfg);
    let first_bytes = std::fs::read(&first.artifacts.permanent_water_acc).unwrap();
    let second = run_analysis(&scene.inputs, &cfg);
    let second_bytes = std::fs::read(&second.artifacts.permanent_water_acc).unwrap();

    assert_eq!(first.status, AnalysisStatus::Completed, "{:?}", first.error_message);
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(first, second);
    assert!(mask(&first.artifacts.permanent_water_acc).count_ones() > 0);
}

#[test]
fn dem_threshold_uses_window_over_imagery() {
    let dir = tempfile::tempdir().unwrap();
    // DEM reaches 20 pixels further west and north than the imagery
    let origin = (ORIGIN.0 - 20.0 * PIXEL, ORIGIN.1 + 20.0 * PIXEL);
    let dem = write_band(dir.path(), "dem", origin, (60, 60), utm(), |_, c| if c < 30 { 1.0 } else { 10.0 });
    let scene = Scene::with_dem(dir, dem, |_, _| 1.0, west_half_water);
    let cfg = config(PermanentWaterSource::DemThreshold { height: 5.0, use_filled: false });

    let result = run_analysis(&scene.inputs, &cfg);
    assert_eq!(result.status, AnalysisStatus::Completed, "{:?}", result.error_message);

    let permanent = mask(&result.artifacts.permanent_water_dem);
    assert_eq!(permanent.shape(), (ROWS, COLS));
    assert_eq!(permanent.count_ones(), 10 * ROWS);
    assert_eq!(permanent.transform(), &GeoTransform::new(ORIGIN.0, ORIGIN.1, PIXEL, -PIXEL));
}

#[test]
fn written_filled_dem_is_reusable_as_already_filled() {
    // Plateau at 1000 m draining to its western edge
    let mut dem = Raster::from_vec(
        (0..40 * 40).map(|i| if i % 40 == 0 { 999.0 } else { 1000.0 }).collect(),
        40,
        40,
    )
    .unwrap();
    dem.set_transform(GeoTransform::new(ORIGIN.0, ORIGIN.1, PIXEL, -PIXEL));
    dem.set_crs(Some(utm()));

    let conditioned = condition_dem(&dem, &ConditioningParams::default()).unwrap();
    assert_eq!(interior_pits(&conditioned.flow_direction), 0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filled.tif");
    write_geotiff(&conditioned.filled, &path).unwrap();
    let reloaded: Raster<f64> = read_geotiff(&path).unwrap();
    let params = ConditioningParams {
        already_filled: true,
        ..Default::default()
    };
    let reused = condition_dem(&reloaded, &params).unwrap();
    assert_eq!(interior_pits(&reused.flow_direction), 0);
    assert_eq!(reused.accumulation.data(), conditioned.accumulation.data());
}

#[test]
fn shared_national_grid_is_resampled_without_reprojection() {
    let dir = tempfile::tempdir().unwrap();
    let laea = CRS::from_epsg(3035);
    let origin = (4_321_000.0, 3_210_000.0);
    // 60 m DEM draining west over 30 m imagery, all in ETRS89-LAEA
    let dem = write_band_at(dir.path(), "dem", origin, (20, 20), 60.0, laea.clone(), |_, c| 10.0 + c as f64);
    let green = write_band_at(dir.path(), "green", origin, (ROWS, COLS), PIXEL, laea.clone(), |_, _| 1.0);
    let swir = write_band_at(dir.path(), "swir", origin, (ROWS, COLS), PIXEL, laea, west_half_water);
    let inputs = AnalysisInputs {
        id: "8".into(),
        name: "laea".into(),
        dem,
        green,
        swir,
        output_dir: dir.path().join("out"),
    };

    let result = run_analysis(&inputs, &config(PermanentWaterSource::Accumulation { threshold: 1 }));
    assert_eq!(result.status, AnalysisStatus::Completed, "{:?}", result.error_message);
    assert_eq!(result.events(Severity::Error).count(), 0);

    // Only the eastern DEM column has no upstream cells; it covers two image columns
    let cell_km2 = PIXEL * PIXEL / 1e6;
    assert_eq!(result.gained.num_polygons, 0);
    assert_relative_eq!(result.persistent.total_area_sqkm, 800.0 * cell_km2, epsilon = 1e-9);
    assert_relative_eq!(result.lost.total_area_sqkm, 720.0 * cell_km2, epsilon = 1e-9);

    let persistent = read_geojson(&result.artifacts.both).unwrap();
    assert_eq!(persistent.crs_or_wgs84().epsg(), Some(4326));
    let bounds = result.map_bounds.unwrap();
    assert!(bounds.west > 9.99 && bounds.east < 10.03, "lon {}..{}", bounds.west, bounds.east);
    assert!(bounds.south > 51.98 && bounds.north < 52.01, "lat {}..{}", bounds.south, bounds.north);
}

#[test]
fn rerun_removes_optional_artifacts_it_no_longer_writes() {
    let scene = Scene::new(|_, _| 1.0, west_half_water);
    let with_extras = AnalysisConfig {
        write_filled_dem: true,
        write_difference_map: true,
        ..config(PermanentWaterSource::Accumulation { threshold: 30 })
    };
    let first = run_analysis(&scene.inputs, &with_extras);
    assert_eq!(first.status, AnalysisStatus::Completed, "{:?}", first.error_message);
    assert!(first.artifacts.filled_dem.exists());
    assert!(first.artifacts.difference_map.exists());

    let cfg = config(PermanentWaterSource::DemThreshold { height: 15.0, use_filled: false });
    let second = run_analysis(&scene.inputs, &cfg);
    assert_eq!(second.status, AnalysisStatus::Completed, "{:?}", second.error_message);
    assert!(!second.artifacts.filled_dem.exists());
    assert!(!second.artifacts.difference_map.exists());
    assert!(!second.artifacts.permanent_water_acc.exists());
    assert!(second.artifacts.permanent_water_dem.exists());
    assert!(second.artifacts.accumulation.exists());
}

#[test]
fn failed_alignment_continues_with_empty_permanent_water() {
    let dir = tempfile::tempdir().unwrap();
    // No EPSG definition exists for this code
    let unknown = CRS::from_epsg(65_000);
    let dem = write_band(dir.path(), "dem", ORIGIN, (ROWS, COLS), unknown, |_, c| 10.0 + c as f64);
    let scene = Scene::with_dem(dir, dem, |_, _| 1.0, west_half_water);
    let cfg = config(PermanentWaterSource::Accumulation { threshold: 1 });

    let result = run_analysis(&scene.inputs, &cfg);
    assert_eq!(result.status, AnalysisStatus::Completed, "{:?}", result.error_message);

    let errors: Vec<_> = result.events(Severity::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stage, Stage::Alignment);
    assert!(errors[0].message.starts_with("alignment error"), "{}", errors[0].message);

    assert_eq!(result.lost.num_polygons, 0);
    assert_eq!(result.persistent.num_polygons, 0);
    assert_relative_eq!(
        result.gained.total_area_sqkm,
        (ROWS * COLS / 2) as f64 * PIXEL * PIXEL / 1e6,
        epsilon = 1e-9
    );
}

#[test]
fn missing_band_ends_in_error_state() {
    let mut scene = Scene::new(|_, _| 1.0, west_half_water);
    scene.inputs.green = scene.dir.path().join("nope.tif");

    let mut seen = Vec::new();
    let result = run_analysis_with(&scene.inputs, &AnalysisConfig::default(), |s| seen.push(s));

    assert_eq!(seen, [AnalysisStatus::Pending, AnalysisStatus::Processing, AnalysisStatus::Error]);
    assert_eq!(result.status, AnalysisStatus::Error);
    let message = result.error_message.as_deref().unwrap();
    assert!(message.starts_with("input error: cannot open green band"), "{}", message);
    assert_eq!(result.trace.last().map(|e| e.stage), Some(Stage::Spectral));
    assert!(!result.artifacts.mndwi_mask.exists());
}

#[test]
fn invalid_config_is_rejected_before_any_work() {
    let scene = Scene::new(|_, _| 1.0, west_half_water);
    let cfg = config(PermanentWaterSource::Accumulation { threshold: 0 });

    let result = run_analysis(&scene.inputs, &cfg);
    assert_eq!(result.status, AnalysisStatus::Error);
    assert_eq!(result.trace.last().map(|e| e.stage), Some(Stage::Setup));
    assert!(!scene.inputs.output_dir.exists());
}
