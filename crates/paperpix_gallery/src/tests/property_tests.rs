//! Invariants checked over many generated sessions.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::session_with_areas;
use crate::{
    compute_visible, project, FilterThreshold, ImageId, ImageRecord, SelectionTracker, SortMode,
};

/// Areas 1..=n shuffled, so every area is distinct.
fn distinct_areas(rng: &mut StdRng, n: u32) -> Vec<u32> {
    let mut areas: Vec<u32> = (1..=n).map(|a| a * 7).collect();
    areas.shuffle(rng);
    areas
}

fn random_areas(rng: &mut StdRng, n: u32) -> Vec<u32> {
    (0..n).map(|_| rng.random_range(1..=6u32)).collect()
}

fn records(areas: &[u32]) -> Vec<ImageRecord> {
    areas
        .iter()
        .enumerate()
        .map(|(i, &area)| {
            ImageRecord::new(ImageId(i as u32), area, 1, vec![0u8], "png").unwrap()
        })
        .collect()
}

#[test]
fn test_hidden_count_matches_floor_for_distinct_areas() {
    let mut rng = StdRng::seed_from_u64(1);
    for n in 0..=25 {
        let images = records(&distinct_areas(&mut rng, n));
        for t in 0..=100 {
            let threshold = FilterThreshold::new(t).unwrap();
            let visible = compute_visible(&images, threshold, &BTreeSet::new());
            let hidden = images.len() - visible.len();
            assert_eq!(hidden, n as usize * t as usize / 100, "n={} t={}", n, t);
        }
    }
}

#[test]
fn test_ties_only_ever_show_more() {
    let mut rng = StdRng::seed_from_u64(2);
    for n in 1..=25 {
        let images = records(&random_areas(&mut rng, n));
        for t in 0..=100 {
            let threshold = FilterThreshold::new(t).unwrap();
            let visible = compute_visible(&images, threshold, &BTreeSet::new());
            let hidden = images.len() - visible.len();
            assert!(hidden <= n as usize * t as usize / 100, "n={} t={}", n, t);
        }
    }
}

#[test]
fn test_zero_threshold_shows_exactly_non_deleted() {
    let mut rng = StdRng::seed_from_u64(3);
    for n in 0..30 {
        let images = records(&random_areas(&mut rng, n));
        let deleted: BTreeSet<ImageId> =
            (0..n).filter(|_| rng.random_range(0..3u32) == 0).map(ImageId).collect();
        let expected: BTreeSet<ImageId> =
            (0..n).map(ImageId).filter(|id| !deleted.contains(id)).collect();
        assert_eq!(
            compute_visible(&images, FilterThreshold::SHOW_ALL, &deleted),
            expected
        );
    }
}

#[test]
fn test_projection_is_a_permutation() {
    let mut rng = StdRng::seed_from_u64(4);
    for n in 0..30 {
        let images = records(&random_areas(&mut rng, n));
        for mode in SortMode::all() {
            let mut projected: Vec<ImageId> =
                project(&images, *mode).iter().map(|img| img.id()).collect();
            projected.sort();
            let expected: Vec<ImageId> = (0..n).map(ImageId).collect();
            assert_eq!(projected, expected, "mode {:?}", mode);
        }
    }
}

#[test]
fn test_range_is_symmetric_and_additive() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..200 {
        let n = rng.random_range(1..=12u32);
        let mut order: Vec<ImageId> = (0..n).map(ImageId).collect();
        order.shuffle(&mut rng);

        let mut base = SelectionTracker::new();
        for id in 0..n {
            if rng.random_range(0..4u32) == 0 {
                base.toggle(ImageId(id));
            }
        }

        let a = ImageId(rng.random_range(0..n));
        let b = ImageId(rng.random_range(0..n));
        let mut forward = base.clone();
        forward.select_range(a, b, &order);
        let mut backward = base.clone();
        backward.select_range(b, a, &order);

        assert_eq!(forward.ids(), backward.ids());
        assert!(base.ids().is_subset(forward.ids()));
    }
}

#[test]
fn test_toggle_twice_restores_selection() {
    let mut rng = StdRng::seed_from_u64(6);
    let mut session = session_with_areas(&[3, 1, 4, 1, 5, 9, 2, 6], 0);
    for _ in 0..100 {
        let id = ImageId(rng.random_range(0..8u32));
        let before = session.selected().clone();
        session.toggle(id).unwrap();
        session.toggle(id).unwrap();
        assert_eq!(session.selected(), &before);
        // leave some state behind for the next round
        session.toggle(ImageId(rng.random_range(0..8u32))).unwrap();
    }
}

#[test]
fn test_deletion_is_monotonic_under_any_operation_sequence() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let n = rng.random_range(1..=15u32);
        let areas = random_areas(&mut rng, n);
        let mut session = session_with_areas(&areas, rng.random_range(0..=100u32));
        let mut deleted_so_far: BTreeSet<ImageId> = BTreeSet::new();

        for _ in 0..40 {
            let id = ImageId(rng.random_range(0..n));
            match rng.random_range(0..5u32) {
                0 => {
                    // deleted ids refuse selection
                    let result = session.selection_click(id, false);
                    assert_eq!(result.is_err(), deleted_so_far.contains(&id));
                }
                1 => {
                    let _ = session.selection_click(id, true);
                }
                2 => {
                    let percent = rng.random_range(0..=100u32);
                    session.set_threshold(FilterThreshold::new(percent).unwrap());
                }
                3 => session.set_sort_mode(session.sort_mode().next()),
                _ => {
                    session.delete_selected();
                }
            }

            assert!(deleted_so_far.is_subset(session.deleted()));
            deleted_so_far = session.deleted().clone();

            let visible = session.visible();
            for deleted in session.deleted() {
                assert!(!visible.contains(deleted));
                assert!(!session.selected().contains(deleted));
                assert!(!session.visual_order().contains(deleted));
            }
        }
    }
}

#[test]
fn test_selection_targets_ignore_filter() {
    let mut rng = StdRng::seed_from_u64(8);
    for _ in 0..100 {
        let n = rng.random_range(2..12u32);
        let mut session = session_with_areas(&random_areas(&mut rng, n), 0);
        let picked: BTreeSet<ImageId> =
            (0..n).filter(|_| rng.random_range(0..2u32) == 0).map(ImageId).collect();
        if picked.is_empty() {
            continue;
        }
        for id in &picked {
            session.toggle(*id).unwrap();
        }

        session.set_threshold(FilterThreshold::new(rng.random_range(0..=100u32)).unwrap());

        let targets: BTreeSet<ImageId> = session
            .download_targets()
            .iter()
            .map(|img| img.id())
            .collect();
        assert_eq!(targets, picked);
    }
}
