use proptest::prelude::*;
use snaplist_core::{
    After, InMemorySource, ListingOptions, ListingRequest, SnapshotId, SnapshotInfo,
    SnapshotState, SortKey, SortOrder, list_snapshots,
};
use std::cmp::Ordering;

use generators::*;

fn everything(source: &InMemorySource, key: SortKey, order: SortOrder) -> Vec<(String, String)> {
    let request = ListingRequest::new().sorted_by(key, order);
    let page = list_snapshots(source, &request, &ListingOptions::default()).expect("list");
    assert!(page.next.is_none());
    keys(&page.snapshots)
}

/// Whether `info` sits on the kept side of an inclusive threshold.
fn passes_threshold(info: &SnapshotInfo, key: SortKey, order: SortOrder, raw: &str) -> bool {
    let cmp = match key {
        SortKey::Name => info.name().cmp(raw),
        SortKey::Repository => info.repository.as_str().cmp(raw),
        _ => {
            let threshold: i64 = raw.parse().expect("numeric threshold");
            key.numeric_value(info).expect("numeric key").cmp(&threshold)
        }
    };
    match order {
        SortOrder::Asc => cmp != Ordering::Less,
        SortOrder::Desc => cmp != Ordering::Greater,
    }
}

fn arb_threshold(key: SortKey) -> BoxedStrategy<String> {
    match key {
        SortKey::Name => "[a-z][0-3]?".boxed(),
        SortKey::Repository => prop::sample::select(vec!["alpha", "b", "beta", "gamma", "z"])
            .prop_map(ToString::to_string)
            .boxed(),
        _ => (0i64..25).prop_map(|v| v.to_string()).boxed(),
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    /// Following `next` tokens visits exactly the unpaged listing, in order.
    #[test]
    fn cursor_pages_concatenate_to_full_listing(
        snapshots in arb_snapshots(60),
        key in arb_sort_key(),
        order in arb_sort_order(),
        size in 1i32..8,
    ) {
        let source = source_of(&snapshots, &[]);
        let expected = everything(&source, key, order);

        let mut seen = Vec::new();
        let mut after: Option<After> = None;
        loop {
            let mut request = ListingRequest::new().sorted_by(key, order).page(size, 0);
            if let Some(cursor) = after.take() {
                request = request.after(cursor);
            }
            let page = list_snapshots(&source, &request, &ListingOptions::default()).expect("page");
            prop_assert!(page.snapshots.len() <= usize::try_from(size).expect("size"));
            prop_assert_eq!(page.total - page.remaining, page.snapshots.len() as u64);
            seen.extend(keys(&page.snapshots));
            match page.next {
                Some(token) => after = Some(After::from_token(&token).expect("token")),
                None => break,
            }
            prop_assert!(seen.len() <= expected.len());
        }
        prop_assert_eq!(seen, expected);
    }

    /// Offset paging agrees with cursor-free slicing of the full listing.
    #[test]
    fn offset_pages_slice_full_listing(
        snapshots in arb_snapshots(40),
        key in arb_sort_key(),
        order in arb_sort_order(),
        size in 1i32..8,
        offset in 0i32..45,
    ) {
        let source = source_of(&snapshots, &[]);
        let expected = everything(&source, key, order);
        let request = ListingRequest::new().sorted_by(key, order).page(size, offset);
        let page = list_snapshots(&source, &request, &ListingOptions::default()).expect("page");

        let start = usize::try_from(offset).expect("offset").min(expected.len());
        let end = (start + usize::try_from(size).expect("size")).min(expected.len());
        prop_assert_eq!(keys(&page.snapshots), expected[start..end].to_vec());
        prop_assert_eq!(page.remaining, (expected.len() - end) as u64);
    }

    /// Catalogue preflight never changes which snapshots a threshold keeps.
    #[test]
    fn threshold_matches_full_filter(
        (snapshots, key, raw) in arb_sort_key().prop_flat_map(|key| {
            (arb_snapshots(50), Just(key), arb_threshold(key))
        }),
        order in arb_sort_order(),
        with_details in prop::collection::vec(any::<bool>(), 50),
    ) {
        let source = source_of(&snapshots, &with_details);
        let request = ListingRequest::new().sorted_by(key, order).from_sort_value(raw.clone());
        let page = list_snapshots(&source, &request, &ListingOptions::default()).expect("page");

        let comparator = key.comparator(order);
        let mut expected: Vec<&SnapshotInfo> = snapshots
            .iter()
            .filter(|info| passes_threshold(info, key, order, &raw))
            .collect();
        expected.sort_by(|a, b| comparator.compare(a, b));
        prop_assert_eq!(keys(&page.snapshots), keys(&expected));
        prop_assert!(page.stats.loaded <= snapshots.len() as u64);
        prop_assert_eq!(source.load_count(), page.stats.loaded);
    }
}

fn snapshot(repository: &str, name: &str, start_time: i64) -> SnapshotInfo {
    SnapshotInfo {
        repository: repository.to_string(),
        snapshot: SnapshotId::new(name, format!("{repository}-{name}")),
        start_time,
        end_time: start_time + 5,
        indices: ["logs".to_string()].into_iter().collect(),
        total_shards: 2,
        failed_shards: 0,
        state: SnapshotState::Success,
    }
}

#[test]
fn start_time_threshold_skips_loads_when_catalogue_has_details() {
    let mut source = InMemorySource::new();
    for (i, start) in [10, 20, 30, 40].into_iter().enumerate() {
        source.add_snapshot(snapshot("alpha", &format!("s{i}"), start), true);
    }
    source.add_snapshot(snapshot("alpha", "legacy", 5), false);

    let request = ListingRequest::new().from_sort_value("25");
    let page = list_snapshots(&source, &request, &ListingOptions::default()).expect("page");

    let names: Vec<&str> = page.snapshots.iter().map(|info| info.name()).collect();
    assert_eq!(names, vec!["s2", "s3"]);
    // s0 and s1 are rejected from the catalogue; legacy has no timestamps and is loaded.
    assert_eq!(page.stats.preflight_excluded, 2);
    assert_eq!(source.load_count(), 3);
}

#[test]
fn shard_threshold_always_loads() {
    let mut source = InMemorySource::new();
    for i in 0..4 {
        source.add_snapshot(snapshot("alpha", &format!("s{i}"), i), true);
    }
    let request = ListingRequest::new()
        .sorted_by(SortKey::Shards, SortOrder::Desc)
        .from_sort_value("1");
    let page = list_snapshots(&source, &request, &ListingOptions::default()).expect("page");
    assert!(page.snapshots.is_empty());
    assert_eq!(page.stats.preflight_excluded, 0);
    assert_eq!(source.load_count(), 4);
}

#[test]
fn missing_descriptor_is_skipped() {
    let mut source = InMemorySource::new();
    source.add_snapshot(snapshot("alpha", "kept", 1), true);
    let gone = source.add_snapshot(snapshot("alpha", "gone", 2), true);
    source.remove_descriptor("alpha", &gone.snapshot);

    let page =
        list_snapshots(&source, &ListingRequest::new(), &ListingOptions::default()).expect("page");
    assert_eq!(page.snapshots.len(), 1);
    assert_eq!(page.stats.load_failures, 1);
    assert!(page.failures.is_empty());
}

#[test]
fn selected_repositories_only() {
    let mut source = InMemorySource::new();
    source.add_snapshot(snapshot("alpha", "a", 1), true);
    source.add_snapshot(snapshot("beta", "b", 2), true);
    source.add_snapshot(snapshot("gamma", "c", 3), true);

    let request = ListingRequest::from_query([("repository", "gamma,alpha"), ("order", "desc")])
        .expect("query");
    let page = list_snapshots(&source, &request, &ListingOptions::default()).expect("page");
    let names: Vec<&str> = page.snapshots.iter().map(|info| info.name()).collect();
    assert_eq!(names, vec!["c", "a"]);
}
