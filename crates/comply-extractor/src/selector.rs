//! Extraction strategy selection

use crate::ExtractorConfig;
use comply_domain::ExtractionStrategy;

/// Pick a strategy for an estimated page count
///
/// `pages <= single_pass_max_pages` is a single pass, up to
/// `two_pass_max_pages` is two passes, anything larger runs in parallel.
pub fn select_strategy(pages: usize, config: &ExtractorConfig) -> ExtractionStrategy {
    if pages <= config.single_pass_max_pages {
        ExtractionStrategy::SinglePass
    } else if pages <= config.two_pass_max_pages {
        ExtractionStrategy::TwoPass
    } else {
        ExtractionStrategy::Parallel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundaries() {
        let config = ExtractorConfig::default();
        assert_eq!(select_strategy(1, &config), ExtractionStrategy::SinglePass);
        assert_eq!(select_strategy(80, &config), ExtractionStrategy::SinglePass);
        assert_eq!(select_strategy(81, &config), ExtractionStrategy::TwoPass);
        assert_eq!(select_strategy(150, &config), ExtractionStrategy::TwoPass);
        assert_eq!(select_strategy(151, &config), ExtractionStrategy::Parallel);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = ExtractorConfig {
            single_pass_max_pages: 10,
            two_pass_max_pages: 20,
            ..Default::default()
        };
        assert_eq!(select_strategy(10, &config), ExtractionStrategy::SinglePass);
        assert_eq!(select_strategy(11, &config), ExtractionStrategy::TwoPass);
        assert_eq!(select_strategy(21, &config), ExtractionStrategy::Parallel);
    }

    proptest! {
        #[test]
        fn prop_single_pass_range(pages in 0usize..=80) {
            prop_assert_eq!(
                select_strategy(pages, &ExtractorConfig::default()),
                ExtractionStrategy::SinglePass
            );
        }

        #[test]
        fn prop_two_pass_range(pages in 81usize..=150) {
            prop_assert_eq!(
                select_strategy(pages, &ExtractorConfig::default()),
                ExtractionStrategy::TwoPass
            );
        }

        #[test]
        fn prop_parallel_range(pages in 151usize..1_000_000) {
            prop_assert_eq!(
                select_strategy(pages, &ExtractorConfig::default()),
                ExtractionStrategy::Parallel
            );
        }

        #[test]
        fn prop_more_pages_never_fewer_calls(a in 0usize..1_000, b in 0usize..1_000) {
            let config = ExtractorConfig::default();
            let (small, large) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                select_strategy(small, &config).expected_calls()
                    <= select_strategy(large, &config).expected_calls()
            );
        }
    }
}
