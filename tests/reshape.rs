use chrono::NaiveDate;
use telechart::domain::model::{Bucket, Evolution, Histogram, MetricKind, TaggedEvolutions};
use telechart::domain::options::sensible_filter_options;
use telechart::domain::regroup::{limit_keys, regroup_by_key, shared_trims, sort_by_tag};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 4, 1).unwrap()
}

fn hist(counts: &[u64]) -> Histogram {
    Histogram::from_buckets(
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| Bucket {
                start: i as f64,
                end: (i + 1) as f64,
                count,
            })
            .collect(),
    )
}

fn evo(counts: &[u64]) -> Evolution {
    Evolution {
        kind: MetricKind::Linear,
        description: "test metric".to_string(),
        measure: "TEST_METRIC".to_string(),
        frames: vec![(date(), hist(counts))],
    }
}

fn tagged(tag: &str, entries: &[(&str, &[u64])]) -> TaggedEvolutions {
    TaggedEvolutions {
        tag: Some(tag.to_string()),
        evolutions: entries
            .iter()
            .map(|(key, counts)| (key.to_string(), evo(counts)))
            .collect(),
    }
}

#[test]
fn os_options_collapse_and_drop_relics() {
    let reduced = sensible_filter_options(
        "os",
        vec![
            "Windows_NT,10.0".to_string(),
            "Windows_95,4.0".to_string(),
            "Linux,4.2".to_string(),
        ],
    );
    assert_eq!(reduced, vec!["Windows_NT", "Linux"]);
}

#[test]
fn os_options_deduplicate_preserving_order() {
    let reduced = sensible_filter_options(
        "os",
        vec![
            "Darwin,15".to_string(),
            "Linux,4.2".to_string(),
            "Darwin,16".to_string(),
        ],
    );
    assert_eq!(reduced, vec!["Darwin", "Linux"]);
}

#[test]
fn application_options_keep_uppercase_names() {
    let reduced = sensible_filter_options(
        "application",
        vec![
            "Firefox".to_string(),
            "fennec".to_string(),
            "3DViewer".to_string(),
            "Thunderbird".to_string(),
        ],
    );
    assert_eq!(reduced, vec!["Firefox", "Thunderbird"]);
}

#[test]
fn unknown_dimension_passes_through() {
    let values = vec!["a".to_string(), "b".to_string()];
    assert_eq!(sensible_filter_options("e10sEnabled", values.clone()), values);
}

#[test]
fn tag_sort_is_descending() {
    let mut maps = vec![
        tagged("Linux", &[("", &[1, 2, 3])]),
        tagged("Windows_NT", &[("", &[1, 2, 3])]),
        tagged("OSX", &[("", &[1, 2, 3])]),
    ];
    sort_by_tag(&mut maps);
    let tags: Vec<_> = maps.iter().map(|m| m.tag.clone().unwrap()).collect();
    assert_eq!(tags, vec!["Windows_NT", "OSX", "Linux"]);
}

#[test]
fn regroup_flips_nesting_to_key_first() {
    let maps = vec![
        tagged("b", &[("content", &[1, 0]), ("plugin", &[2, 0])]),
        tagged("a", &[("content", &[3, 0])]),
    ];
    let groups = regroup_by_key(maps);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, "content");
    assert_eq!(groups[0].members.len(), 2);
    assert_eq!(groups[0].members[0].tag.as_deref(), Some("b"));
    assert_eq!(groups[0].members[1].tag.as_deref(), Some("a"));
    assert_eq!(groups[1].key, "plugin");
    assert_eq!(groups[1].members.len(), 1);
}

#[test]
fn key_limit_keeps_top_keys_by_total_count() {
    let maps = vec![tagged(
        "v",
        &[
            ("low", &[1, 0]),
            ("high", &[50, 0]),
            ("mid", &[10, 0]),
            ("tiny", &[0, 1]),
        ],
    )];
    let groups = limit_keys(regroup_by_key(maps), 2);
    let keys: Vec<_> = groups.iter().map(|g| g.key.clone()).collect();
    assert_eq!(keys, vec!["high", "mid"]);
}

#[test]
fn key_limit_breaks_ties_by_encounter_order() {
    let maps = vec![tagged(
        "v",
        &[("alpha", &[5, 0]), ("beta", &[5, 0]), ("gamma", &[5, 0])],
    )];
    let groups = limit_keys(regroup_by_key(maps), 2);
    let keys: Vec<_> = groups.iter().map(|g| g.key.clone()).collect();
    // BTreeMap ordering makes encounter order alphabetical within one map.
    assert_eq!(keys, vec!["alpha", "beta"]);
}

#[test]
fn trims_never_reduce_below_three_buckets() {
    // Every bucket is below the cutoff, so only the 3-bucket floor stops it.
    let evos = vec![evo(&[0, 0, 0, 0, 0, 1])];
    let refs: Vec<_> = evos.iter().collect();
    let (left, right) = shared_trims(&refs);
    assert!(6 - left - right >= 3);
    assert_eq!((left, right), (3, 0));
}

#[test]
fn trims_take_minimum_across_siblings() {
    // First sibling could trim two from the left, second only one.
    let a = evo(&[0, 0, 5000, 5000, 5000]);
    let b = evo(&[0, 5000, 5000, 5000, 0]);
    let evos = vec![a, b];
    let refs: Vec<_> = evos.iter().collect();
    let (left, right) = shared_trims(&refs);
    assert_eq!((left, right), (1, 0));
}

#[test]
fn trims_are_maximal_within_bounds() {
    let e = evo(&[0, 0, 10_000, 10_000, 10_000, 0]);
    let evos = vec![e];
    let refs: Vec<_> = evos.iter().collect();
    let (left, right) = shared_trims(&refs);
    assert_eq!((left, right), (2, 1));
}

#[test]
fn percentile_interpolates_within_bucket() {
    let h = hist(&[0, 10, 0]);
    // All samples sit in [1, 2); the median lands halfway through it.
    assert_eq!(h.percentile(50.0), Some(1.5));
}

#[test]
fn percentile_none_when_empty() {
    assert_eq!(hist(&[0, 0]).percentile(50.0), None);
}

#[test]
fn aggregate_histogram_sums_frames() {
    let e = Evolution {
        frames: vec![(date(), hist(&[1, 2])), (date(), hist(&[3, 4]))],
        ..evo(&[0])
    };
    let agg = e.histogram();
    assert_eq!(agg.count, 10);
    assert_eq!(agg.buckets[0].count, 4);
    assert_eq!(agg.buckets[1].count, 6);
}

#[test]
fn sanitized_drops_empty_frames() {
    let e = Evolution {
        frames: vec![(date(), hist(&[0, 0])), (date(), hist(&[1, 0]))],
        ..evo(&[0])
    };
    let s = e.sanitized().unwrap();
    assert_eq!(s.frames.len(), 1);
    assert!(hist(&[0]).count == 0);
    assert!(evo(&[0]).sanitized().is_none());
}
