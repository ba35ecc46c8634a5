use std::collections::HashSet;

use rand::prelude::*;
use rstest::*;
use vidmatch::index::{EmbeddingRecord, IndexKind};
use vidmatch::quality::VideoStats;
use vidmatch::{MatchConfig, MatchEngine, MatchError, Stage};

fn config(match_distance: f32, neighbors: usize) -> MatchConfig {
    MatchConfig { match_distance, neighbors, ..Default::default() }
}

fn stats(id: &str, length: f32, gray_max: f32) -> VideoStats {
    VideoStats {
        video_id: id.to_string(),
        video_length_seconds: length,
        activity_mean: 1.0,
        activity_std: 0.0,
        activity_max_delta: 0.0,
        gray_mean: gray_max / 2.0,
        gray_std: 1.0,
        gray_max,
    }
}

/// 坐标量化到 0.1 的随机数据，制造大量距离相同的近邻
#[fixture]
fn dataset() -> Vec<EmbeddingRecord> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..300)
        .map(|i| {
            let vector = (0..8).map(|_| rng.random_range(0..4) as f32 / 10.0).collect();
            EmbeddingRecord::new(format!("video_{i:04}"), vector)
        })
        .collect()
}

#[test]
fn exact_duplicate_pair() {
    let engine = MatchEngine::new(MatchConfig { filter_dark_videos: true, ..config(0.1, 20) })
        .unwrap();
    let embeddings = vec![
        EmbeddingRecord::new("a", vec![0.3, 0.4, 0.5]),
        EmbeddingRecord::new("b", vec![0.3, 0.4, 0.5]),
    ];
    let quality = vec![stats("a", 60.0, 120.0), stats("b", 60.0, 120.0)];
    let report = engine.run(embeddings, Some(quality)).unwrap();

    assert_eq!(report.unfiltered.len(), 1);
    let entry = &report.unfiltered.entries()[0];
    assert_eq!((entry.query_video.as_str(), entry.match_video.as_str()), ("a", "b"));
    assert_eq!(entry.distance, 0.0);
    assert_eq!(report.filtered.as_ref(), Some(&report.unfiltered));
}

#[test]
fn quality_suppression() {
    let engine = MatchEngine::new(MatchConfig {
        filter_dark_videos: true,
        min_video_duration_seconds: 5.0,
        ..config(0.1, 20)
    })
    .unwrap();
    let embeddings = vec![
        EmbeddingRecord::new("A", vec![0.0, 0.0]),
        EmbeddingRecord::new("B", vec![0.0, 0.05]),
        EmbeddingRecord::new("C", vec![3.0, 3.0]),
    ];
    let quality = vec![stats("A", 30.0, 100.0), stats("B", 2.0, 100.0), stats("C", 30.0, 100.0)];
    let report = engine.run(embeddings, Some(quality)).unwrap();

    let b = report.quality.iter().find(|r| r.video_id == "B").unwrap();
    assert!(b.duration_flag && !b.dark_flag && b.flagged);
    assert_eq!(report.unfiltered.len(), 1);
    assert!(report.unfiltered.entries()[0].involves("B"));
    assert!(report.filtered.unwrap().is_empty());
}

#[test]
fn no_neighbors_within_threshold() {
    let engine = MatchEngine::new(config(0.1, 20)).unwrap();
    let embeddings = vec![
        EmbeddingRecord::new("near1", vec![0.0, 0.0]),
        EmbeddingRecord::new("near2", vec![0.0, 0.01]),
        EmbeddingRecord::new("far", vec![3.0, 4.0]),
    ];
    let report = engine.run(embeddings, None).unwrap();
    assert_eq!(report.unfiltered.len(), 1);
    assert!(report.unfiltered.iter().all(|e| !e.involves("far")));
}

#[rstest]
fn k_larger_than_dataset(
    #[values(IndexKind::BruteForce, IndexKind::KdTree)] index: IndexKind,
    #[values(20, usize::MAX)] k: usize,
) {
    let engine = MatchEngine::new(MatchConfig { index, ..config(100.0, k) }).unwrap();
    let embeddings = vec![
        EmbeddingRecord::new("x", vec![0.0]),
        EmbeddingRecord::new("y", vec![1.0]),
        EmbeddingRecord::new("z", vec![2.0]),
    ];
    let row = engine.query(embeddings.clone(), "y").unwrap().unwrap();
    assert_eq!(row.neighbors.len(), 3);
    assert_eq!(row.neighbors[0], ("y".to_string(), 0.0));

    // 所有 3 个视频两两匹配
    let report = engine.run(embeddings, None).unwrap();
    assert_eq!(report.unfiltered.len(), 3);
}

#[test]
fn hub_cluster_comes_first() {
    let engine = MatchEngine::new(config(1.2, 20)).unwrap();
    // e 到 a b c d 的距离都是 1，a b c d 之间的距离大于 1.2
    let embeddings = vec![
        EmbeddingRecord::new("a", vec![1.0, 0.0]),
        EmbeddingRecord::new("b", vec![0.0, 1.0]),
        EmbeddingRecord::new("c", vec![-1.0, 0.0]),
        EmbeddingRecord::new("d", vec![0.0, -1.0]),
        EmbeddingRecord::new("e", vec![0.0, 0.0]),
        EmbeddingRecord::new("x", vec![10.0, 10.0]),
        EmbeddingRecord::new("y", vec![10.0, 10.5]),
    ];
    let report = engine.run(embeddings, None).unwrap();
    let rows = report
        .unfiltered
        .iter()
        .map(|e| (e.query_video.as_str(), e.match_video.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(rows, [("e", "a"), ("e", "b"), ("e", "c"), ("e", "d"), ("x", "y")]);
}

#[rstest]
fn threshold_and_no_self_matches(dataset: Vec<EmbeddingRecord>) {
    let threshold = 0.3;
    let report = MatchEngine::new(config(threshold, 10)).unwrap().run(dataset, None).unwrap();
    assert!(!report.unfiltered.is_empty());
    let mut keys = HashSet::new();
    for e in &report.unfiltered {
        assert_ne!(e.query_video, e.match_video);
        assert!(e.distance <= threshold);
        // 每个无序对只出现一次
        assert!(keys.insert(e.key()));
    }
}

#[rstest]
fn brute_force_and_kdtree_agree(dataset: Vec<EmbeddingRecord>) {
    let run = |index| {
        let engine = MatchEngine::new(MatchConfig { index, ..config(0.4, 15) }).unwrap();
        engine.run(dataset.clone(), None).unwrap()
    };
    let brute = run(IndexKind::BruteForce);
    let kdtree = run(IndexKind::KdTree);
    assert_eq!(brute.unfiltered, kdtree.unfiltered);
    assert_eq!(brute.digest(), kdtree.digest());
}

#[rstest]
fn determinism(dataset: Vec<EmbeddingRecord>) {
    let mut shuffled = dataset.clone();
    shuffled.shuffle(&mut StdRng::seed_from_u64(1));

    let first = MatchEngine::new(MatchConfig { threads: 1, ..config(0.4, 15) })
        .unwrap()
        .run(dataset, None)
        .unwrap();
    let second = MatchEngine::new(MatchConfig { threads: 4, ..config(0.4, 15) })
        .unwrap()
        .run(shuffled, None)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.digest(), second.digest());
}

#[rstest]
fn filtered_is_subset_of_unfiltered(dataset: Vec<EmbeddingRecord>) {
    let mut rng = StdRng::seed_from_u64(3);
    let quality = dataset
        .iter()
        .map(|r| stats(&r.video_id, rng.random_range(0.0..10.0), rng.random_range(0.0..10.0)))
        .collect::<Vec<_>>();

    let engine = MatchEngine::new(MatchConfig { filter_dark_videos: true, ..config(0.4, 15) })
        .unwrap();
    let report = engine.run(dataset, Some(quality)).unwrap();
    let filtered = report.filtered.as_ref().unwrap();
    let flagged = report
        .quality
        .iter()
        .filter(|r| r.flagged)
        .map(|r| r.video_id.as_str())
        .collect::<HashSet<_>>();

    assert!(filtered.len() < report.unfiltered.len());
    for (entry, discarded) in report.unfiltered.iter().zip(report.discarded()) {
        let has_flagged = flagged.contains(entry.query_video.as_str())
            || flagged.contains(entry.match_video.as_str());
        assert_eq!(discarded, has_flagged);
        assert_eq!(filtered.contains(entry), !has_flagged);
    }
}

#[rstest]
#[case::empty(vec![], Stage::Index)]
#[case::dimension(
    vec![EmbeddingRecord::new("a", vec![0.0, 1.0]), EmbeddingRecord::new("b", vec![0.0])],
    Stage::Index
)]
#[case::duplicate(
    vec![EmbeddingRecord::new("a", vec![0.0]), EmbeddingRecord::new("a", vec![1.0])],
    Stage::Index
)]
fn invalid_input(#[case] embeddings: Vec<EmbeddingRecord>, #[case] stage: Stage) {
    let err = MatchEngine::new(config(0.5, 5)).unwrap().run(embeddings, None).unwrap_err();
    assert_eq!(err.stage(), stage);
}

#[test]
fn dimension_mismatch_names_video() {
    let embeddings =
        vec![EmbeddingRecord::new("a", vec![0.0, 1.0]), EmbeddingRecord::new("b", vec![0.0])];
    let err = MatchEngine::new(config(0.5, 5)).unwrap().run(embeddings, None).unwrap_err();
    assert_eq!(err, MatchError::DimensionMismatch { video_id: "b".into(), expected: 2, actual: 1 });
    assert!(err.to_string().contains("[index]"));
}

#[rstest]
#[case::strict(false)]
#[case::tolerant(true)]
fn missing_quality_data(#[case] tolerate: bool) {
    let engine = MatchEngine::new(MatchConfig {
        filter_dark_videos: true,
        tolerate_missing_quality: tolerate,
        ..config(0.5, 5)
    })
    .unwrap();
    let embeddings =
        vec![EmbeddingRecord::new("a", vec![0.0]), EmbeddingRecord::new("b", vec![0.1])];
    let result = engine.run(embeddings, Some(vec![stats("a", 60.0, 100.0)]));
    if tolerate {
        let report = result.unwrap();
        assert_eq!(report.filtered.unwrap().len(), 1);
    } else {
        let err = result.unwrap_err();
        assert_eq!(err, MatchError::MissingQualityData { video_ids: vec!["b".into()] });
    }
}

#[test]
fn invalid_threshold_before_computation() {
    let err = MatchEngine::new(config(-1.0, 5)).err().unwrap();
    assert_eq!(err.stage(), Stage::Config);
    let err = MatchEngine::new(MatchConfig { dark_frame_threshold: 0.0, ..config(0.5, 5) })
        .err()
        .unwrap();
    assert!(matches!(err, MatchError::InvalidThreshold { name: "filter_dark_videos_thr", .. }));
}
