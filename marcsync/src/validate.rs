//! Batch consistency checks.
//!
//! The producer publishes some categories as companion pairs: one file with
//! local data and one without. A batch holding an odd number of such files
//! means generation is still running, and fetching half of it would leave
//! the downstream data inconsistent. Every check here runs before the first
//! file of a batch is downloaded.

use crate::category::{Category, CategoryKind, FilenameMatcher};
use crate::date::DumpDate;
use crate::error::ConsistencyError;

/// True if `filenames` is an acceptable batch for `matcher`.
///
/// An empty batch is always complete. For paired categories the number of
/// names matching the pattern must be even; unpaired categories are always
/// complete.
pub fn is_batch_complete(matcher: &FilenameMatcher, filenames: &[String]) -> bool {
    if filenames.is_empty() || !matcher.requires_paired_instances() {
        return true;
    }
    matching_count(matcher, filenames) % 2 == 0
}

/// Refuses an incomplete batch for `category`.
pub fn check_batch(category: &Category, filenames: &[String]) -> Result<(), ConsistencyError> {
    if is_batch_complete(&category.matcher, filenames) {
        Ok(())
    } else {
        Err(ConsistencyError::IncompletePair {
            kind: category.kind,
            count: matching_count(&category.matcher, filenames),
        })
    }
}

/// Validates a full-dump batch and returns its date.
///
/// - paired: the batch must be complete and every file must carry the same
///   date
/// - unpaired: at most one full dump may be waiting
///
/// Returns `None` for an empty batch.
pub fn check_full_dump(
    matcher: &FilenameMatcher,
    filenames: &[String],
) -> Result<Option<DumpDate>, ConsistencyError> {
    let dates: Vec<DumpDate> = filenames.iter().filter_map(|f| matcher.matches(f)).collect();

    let Some(&first) = dates.first() else {
        return Ok(None);
    };

    if matcher.requires_paired_instances() {
        if dates.len() % 2 != 0 {
            return Err(ConsistencyError::IncompletePair {
                kind: CategoryKind::FullDump,
                count: dates.len(),
            });
        }
        if let Some(&other) = dates.iter().find(|&&d| d != first) {
            return Err(ConsistencyError::MixedDates { first, other });
        }
    } else if dates.len() > 1 {
        return Err(ConsistencyError::MultipleFullDumps {
            count: dates.len(),
            files: filenames.to_vec(),
        });
    }

    Ok(Some(first))
}

fn matching_count(matcher: &FilenameMatcher, filenames: &[String]) -> usize {
    filenames.iter().filter(|f| matcher.is_match(f)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIFFERENTIAL: &str =
        r"^(?:TA-MARC-ixtheo|SA-MARC-ixtheo_o|TA-MARC-ixtheo_o)-(\d\d\d\d\d\d)\.tar\.gz$";
    const FULL: &str = r"^(?:SA-MARC-ixtheo|SA-MARC-ixtheo_o)-(\d\d\d\d\d\d)\.tar\.gz$";

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn differential(paired: bool) -> Category {
        Category::new(
            CategoryKind::Differential,
            FilenameMatcher::new(DIFFERENTIAL, paired).unwrap(),
            "/ixtheo",
        )
    }

    #[test]
    fn test_empty_batch_is_complete() {
        assert!(is_batch_complete(&differential(true).matcher, &[]));
    }

    #[test]
    fn test_paired_batch_needs_even_count() {
        let matcher = differential(true).matcher;
        let two = names(&["TA-MARC-ixtheo-200105.tar.gz", "TA-MARC-ixtheo_o-200105.tar.gz"]);
        let three = names(&[
            "TA-MARC-ixtheo-200105.tar.gz",
            "TA-MARC-ixtheo_o-200105.tar.gz",
            "TA-MARC-ixtheo-200106.tar.gz",
        ]);
        assert!(is_batch_complete(&matcher, &two));
        assert!(!is_batch_complete(&matcher, &three));
    }

    #[test]
    fn test_unpaired_batch_is_always_complete() {
        let matcher = differential(false).matcher;
        let one = names(&["TA-MARC-ixtheo-200105.tar.gz"]);
        assert!(is_batch_complete(&matcher, &one));
    }

    #[test]
    fn test_non_matching_names_are_not_counted() {
        let matcher = differential(true).matcher;
        let batch = names(&["TA-MARC-ixtheo-200105.tar.gz", "README"]);
        assert!(!is_batch_complete(&matcher, &batch));
    }

    #[test]
    fn test_check_batch_reports_count() {
        let batch = names(&[
            "TA-MARC-ixtheo-200105.tar.gz",
            "TA-MARC-ixtheo_o-200105.tar.gz",
            "SA-MARC-ixtheo_o-200105.tar.gz",
        ]);
        assert_eq!(
            check_batch(&differential(true), &batch),
            Err(ConsistencyError::IncompletePair {
                kind: CategoryKind::Differential,
                count: 3
            })
        );
    }

    #[test]
    fn test_full_dump_empty() {
        let matcher = FilenameMatcher::new(FULL, false).unwrap();
        assert_eq!(check_full_dump(&matcher, &[]), Ok(None));
    }

    #[test]
    fn test_full_dump_single_unpaired() {
        let matcher = FilenameMatcher::new(FULL, false).unwrap();
        let batch = names(&["SA-MARC-ixtheo-200102.tar.gz"]);
        assert_eq!(
            check_full_dump(&matcher, &batch),
            Ok(Some("200102".parse().unwrap()))
        );
    }

    #[test]
    fn test_full_dump_multiple_unpaired() {
        let matcher = FilenameMatcher::new(FULL, false).unwrap();
        let batch = names(&["SA-MARC-ixtheo-200102.tar.gz", "SA-MARC-ixtheo-200103.tar.gz"]);
        assert!(matches!(
            check_full_dump(&matcher, &batch),
            Err(ConsistencyError::MultipleFullDumps { count: 2, .. })
        ));
    }

    #[test]
    fn test_full_dump_paired_same_date() {
        let matcher = FilenameMatcher::new(FULL, true).unwrap();
        let batch = names(&["SA-MARC-ixtheo-200102.tar.gz", "SA-MARC-ixtheo_o-200102.tar.gz"]);
        assert_eq!(
            check_full_dump(&matcher, &batch),
            Ok(Some("200102".parse().unwrap()))
        );
    }

    #[test]
    fn test_full_dump_paired_mixed_dates() {
        let matcher = FilenameMatcher::new(FULL, true).unwrap();
        let batch = names(&["SA-MARC-ixtheo-200102.tar.gz", "SA-MARC-ixtheo_o-200103.tar.gz"]);
        assert_eq!(
            check_full_dump(&matcher, &batch),
            Err(ConsistencyError::MixedDates {
                first: "200102".parse().unwrap(),
                other: "200103".parse().unwrap(),
            })
        );
    }

    #[test]
    fn test_full_dump_paired_incomplete() {
        let matcher = FilenameMatcher::new(FULL, true).unwrap();
        let batch = names(&["SA-MARC-ixtheo-200102.tar.gz"]);
        assert!(matches!(
            check_full_dump(&matcher, &batch),
            Err(ConsistencyError::IncompletePair { count: 1, .. })
        ));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_pairing_iff_even(count in 0usize..=4) {
                let matcher = differential(true).matcher;
                let batch: Vec<String> = (0..count)
                    .map(|i| format!("TA-MARC-ixtheo-2001{:02}.tar.gz", i + 1))
                    .collect();
                prop_assert_eq!(is_batch_complete(&matcher, &batch), count % 2 == 0);
            }

            #[test]
            fn test_unpaired_always_complete(count in 0usize..=4) {
                let matcher = differential(false).matcher;
                let batch: Vec<String> = (0..count)
                    .map(|i| format!("TA-MARC-ixtheo-2001{:02}.tar.gz", i + 1))
                    .collect();
                prop_assert!(is_batch_complete(&matcher, &batch));
            }
        }
    }
}
