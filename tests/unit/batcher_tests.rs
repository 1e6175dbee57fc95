/*!
 * Tests for scene and batch partitioning
 */

use subtrans::batcher::{BatcherConfig, SubtitleBatcher};
use subtrans::document::{SubtitleLine, SubtitleScene};
use subtrans::errors::SubtitleError;

use crate::common;

/// Small deterministic generator so the property tests cover varied inputs
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

fn random_lines(seed: u64, count: usize) -> Vec<SubtitleLine> {
    let mut rng = Lcg(seed);
    let mut time = 0;
    (1..=count)
        .map(|number| {
            // Mostly short pauses, occasionally a long one
            let gap = if rng.next(10) == 0 { 20_000 + rng.next(40_000) } else { rng.next(3_000) };
            time += gap;
            let duration = 500 + rng.next(3_000);
            let line = SubtitleLine::new(number, time, time + duration, format!("Line {}", number));
            time += duration;
            line
        })
        .collect()
}

fn batcher(threshold: u64, min: usize, max: usize) -> SubtitleBatcher {
    SubtitleBatcher::new(BatcherConfig {
        scene_threshold_ms: threshold,
        min_batch_size: min,
        max_batch_size: max,
        prevent_overlap: true,
    })
    .unwrap()
}

fn flatten(scenes: &[SubtitleScene]) -> Vec<SubtitleLine> {
    scenes.iter().flat_map(|scene| scene.originals().cloned()).collect()
}

#[test]
fn test_batcher_batchSubtitles_withManyInputs_shouldPreserveLineSequence() {
    for seed in 0..25 {
        let lines = random_lines(seed, 20 + (seed as usize * 7) % 90);
        let scenes = batcher(15_000, 4, 12).batch_subtitles(&lines);

        assert_eq!(flatten(&scenes), lines, "seed {}", seed);
    }
}

#[test]
fn test_batcher_batchSubtitles_withManyInputs_shouldRespectSizeLimitsExceptLastBatch() {
    for seed in 0..25 {
        let lines = random_lines(seed, 30 + (seed as usize * 11) % 120);
        let scenes = batcher(15_000, 5, 15).batch_subtitles(&lines);

        for scene in &scenes {
            let last = scene.batches.len() - 1;
            for (index, batch) in scene.batches.iter().enumerate() {
                assert!(batch.size() <= 15, "seed {} scene {} batch {}", seed, scene.number, batch.number);
                if index != last {
                    assert!(batch.size() >= 5, "seed {} scene {} batch {}", seed, scene.number, batch.number);
                }
            }
        }
    }
}

#[test]
fn test_batcher_batchSubtitles_shouldNumberScenesAndBatchesSequentially() {
    let lines = random_lines(42, 150);
    let scenes = batcher(15_000, 5, 15).batch_subtitles(&lines);

    for (scene_index, scene) in scenes.iter().enumerate() {
        assert_eq!(scene.number, scene_index + 1);
        for (batch_index, batch) in scene.batches.iter().enumerate() {
            assert_eq!(batch.number, batch_index + 1);
            assert_eq!(batch.scene, scene.number);
        }
    }
}

#[test]
fn test_batcher_batchSubtitles_withTwoDistantLines_shouldCreateTwoScenes() {
    let lines = vec![
        SubtitleLine::new(1, 0, 1_000, "A"),
        SubtitleLine::new(2, 30_000, 31_000, "B"),
    ];

    let scenes = batcher(10_000, 1, 10).batch_subtitles(&lines);

    assert_eq!(scenes.len(), 2);
    for scene in &scenes {
        assert_eq!(scene.batches.len(), 1);
        assert_eq!(scene.batches[0].size(), 1);
    }
}

#[test]
fn test_batcher_batchSubtitles_withEvenlySpacedLines_shouldStayInOneScene() {
    let scenes = batcher(10_000, 3, 8).batch_subtitles(&common::timed_lines(20));

    assert_eq!(scenes.len(), 1);
    assert_eq!(scenes[0].line_count(), 20);
    assert!(scenes[0].batches.iter().all(|batch| (3..=8).contains(&batch.size())));
}

#[test]
fn test_batcherConfig_validate_withMinAboveMax_shouldBeConfigError() {
    let config = BatcherConfig {
        min_batch_size: 20,
        max_batch_size: 10,
        ..Default::default()
    };

    let error = SubtitleBatcher::new(config).err().unwrap();

    assert!(matches!(error, SubtitleError::Config(_)));
}

#[test]
fn test_batcherConfig_deserialize_shouldFillDefaults() {
    let config: BatcherConfig = serde_json::from_str(r#"{ "scene_threshold_ms": 5000 }"#).unwrap();

    assert_eq!(config.scene_threshold_ms, 5_000);
    assert_eq!(config.min_batch_size, 10);
    assert_eq!(config.max_batch_size, 30);
    assert!(config.prevent_overlap);
}
