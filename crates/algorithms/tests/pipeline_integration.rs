//! End-to-end pipeline test on synthetic scenes

use std::collections::HashMap;

use compositar_algorithms::composite::{REFLECTANCE_OFFSET, REFLECTANCE_SCALE};
use compositar_algorithms::pipeline::{run_pipeline, ExportSink, PipelineParams, SceneSource};
use compositar_core::prelude::*;

const N: usize = 30;

fn dn_for(reflectance: f64) -> f64 {
    (reflectance - REFLECTANCE_OFFSET) / REFLECTANCE_SCALE
}

/// A scene with a rural/urban split so NDBI separates cleanly, and an
/// optional clouded rectangle in the QA grid.
fn scene(year: i32, cloud_cover: f64, clouded: Option<(usize, usize, usize, usize)>) -> Scene {
    let transform = GeoTransform::new(0.0, N as f64, 1.0, -1.0);
    let bands = LANDSAT_SR_BANDS
        .iter()
        .map(|&name| {
            let mut band = Raster::new(N, N);
            band.set_transform(transform);
            for row in 0..N {
                for col in 0..N {
                    let built = col >= N / 2;
                    let refl = match name {
                        "SR_B5" => {
                            if built {
                                0.15
                            } else {
                                0.55
                            }
                        }
                        "SR_B6" => {
                            if built {
                                0.55
                            } else {
                                0.15
                            }
                        }
                        _ => 0.25,
                    };
                    band.set(row, col, dn_for(refl)).unwrap();
                }
            }
            band
        })
        .collect();
    let stack = BandStack::landsat_sr(bands).unwrap();

    let mut qa = Raster::<u16>::new(N, N);
    if let Some((r0, r1, c0, c1)) = clouded {
        for row in r0..r1 {
            for col in c0..c1 {
                qa.set(row, col, 1 << 3).unwrap();
            }
        }
    }

    Scene::new(format!("scene_{}_{}", year, cloud_cover), year, cloud_cover, stack, qa).unwrap()
}

struct MapSource(HashMap<i32, Vec<Scene>>);

impl SceneSource for MapSource {
    fn scenes_for_year(&self, year: i32) -> Result<Vec<Scene>> {
        Ok(self.0.get(&year).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct CollectingSink {
    composites: Vec<(i32, BandStack)>,
    indices: Vec<(i32, String)>,
    classifications: Vec<(i32, f64, Raster<u8>)>,
}

impl ExportSink for CollectingSink {
    fn export_composite(&mut self, year: i32, composite: &BandStack) -> Result<()> {
        self.composites.push((year, composite.clone()));
        Ok(())
    }

    fn export_index(&mut self, year: i32, name: &str, _index: &Raster<f64>) -> Result<()> {
        self.indices.push((year, name.to_string()));
        Ok(())
    }

    fn export_classification(
        &mut self,
        year: i32,
        threshold: f64,
        classified: &Raster<u8>,
    ) -> Result<()> {
        self.classifications.push((year, threshold, classified.clone()));
        Ok(())
    }
}

fn sentinel_count(band: &Raster<f64>) -> usize {
    band.data().iter().filter(|&&v| v == SENTINEL).count()
}

#[test]
fn three_year_run_with_persistent_and_transient_gaps() {
    // Year 1: clean coverage.
    // Year 2: every scene clouded over the same 12x12 block (144 px, above
    //   the small-gap limit); the prior year repairs it.
    // Year 3: one scene with a 2x2 nick only; spatial fill could repair it
    //   even without the prior.
    let mut years = HashMap::new();
    years.insert(2013, vec![scene(2013, 10.0, None), scene(2013, 25.0, None)]);
    years.insert(
        2014,
        vec![
            scene(2014, 40.0, Some((5, 17, 5, 17))),
            scene(2014, 55.0, Some((5, 17, 5, 17))),
        ],
    );
    years.insert(2015, vec![scene(2015, 15.0, Some((20, 22, 20, 22)))]);

    let source = MapSource(years);
    let mut sink = CollectingSink::default();
    let region = Region::full(N, N);
    let params = PipelineParams {
        start_year: 2013,
        end_year: 2015,
        ..Default::default()
    };

    let summaries = run_pipeline(&source, &region, &mut sink, &params).unwrap();
    assert_eq!(summaries.len(), 3);

    // Every year exports a composite, three indices and a classification
    assert_eq!(sink.composites.len(), 3);
    assert_eq!(sink.indices.len(), 9);
    assert_eq!(sink.classifications.len(), 3);

    // Year 2: the prior composite repairs the clouded block, nothing missing
    let (_, year2) = &sink.composites[1];
    assert_eq!(sentinel_count(year2.band("SR_B1").unwrap()), 0);
    assert_eq!(summaries[1].missing_any_count, 0);
    for d in &summaries[1].diagnostics {
        assert_eq!(d.missing_count, 0);
        assert_eq!(d.total_count, N * N);
        assert_eq!(d.missing_percent, 0.0);
    }

    // Thresholds separate the two NDBI modes every year
    for (year, threshold, classified) in &sink.classifications {
        assert!(
            *threshold > -0.6 && *threshold < 0.6,
            "year {} threshold {} outside the bimodal gap",
            year,
            threshold
        );
        // Urban half classified as built-up, rural half not
        assert_eq!(classified.get(0, N - 1).unwrap(), 1);
        assert_eq!(classified.get(0, 0).unwrap(), 0);
    }

    // Composites are fully valid reflectance or sentinel
    for (_, composite) in &sink.composites {
        for (_, band) in composite.iter() {
            for &v in band.data().iter() {
                assert!((0.0..=1.0).contains(&v) || v == SENTINEL);
            }
        }
    }
}

#[test]
fn first_year_large_gap_stays_missing() {
    // No prior year exists, so a large clouded block survives the cascade
    // and is reported by the diagnostics.
    let mut years = HashMap::new();
    years.insert(2013, vec![scene(2013, 30.0, Some((5, 20, 5, 20)))]);

    let source = MapSource(years);
    let mut sink = CollectingSink::default();
    let region = Region::full(N, N);
    let params = PipelineParams {
        start_year: 2013,
        end_year: 2013,
        ..Default::default()
    };

    let summaries = run_pipeline(&source, &region, &mut sink, &params).unwrap();
    let summary = &summaries[0];

    // 15x15 = 225 px gap, above the limit; the interior cannot be filled.
    // Border pixels within focal reach of valid data stay sentinel too,
    // because the component as a whole is ineligible.
    for d in &summary.diagnostics {
        assert_eq!(d.missing_count, 225, "band {}", d.band);
        assert!(d.missing_percent > 0.0);
    }
    // Bands miss the same pixels, so the union equals one band's count
    assert_eq!(summary.missing_any_count, 225);

    let (_, composite) = &sink.composites[0];
    assert_eq!(composite.band("SR_B4").unwrap().get(12, 12).unwrap(), SENTINEL);
}

#[test]
fn region_bounds_exclude_outside_pixels() {
    let mut years = HashMap::new();
    years.insert(2013, vec![scene(2013, 10.0, None)]);

    let source = MapSource(years);
    let mut sink = CollectingSink::default();

    let transform = GeoTransform::new(0.0, N as f64, 1.0, -1.0);
    let region = Region::from_bounds(5.0, 5.0, 25.0, 25.0, &transform, N, N);
    let inside = region.pixel_count();
    assert!(inside < N * N);

    let params = PipelineParams {
        start_year: 2013,
        end_year: 2013,
        ..Default::default()
    };
    let summaries = run_pipeline(&source, &region, &mut sink, &params).unwrap();

    for d in &summaries[0].diagnostics {
        assert_eq!(d.total_count, inside);
        assert_eq!(d.missing_count, 0);
    }

    // Outside the region everything is sentinel
    let (_, composite) = &sink.composites[0];
    assert_eq!(composite.band("SR_B1").unwrap().get(0, 0).unwrap(), SENTINEL);
}
