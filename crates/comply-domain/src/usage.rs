//! Token usage accounting

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Token counts reported by the model for one or more calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens (including the document)
    pub input_tokens: u64,

    /// Generated tokens
    pub output_tokens: u64,

    /// Prompt tokens served from a cache
    pub cached_tokens: u64,
}

impl TokenUsage {
    /// Create a usage record
    pub fn new(input_tokens: u64, output_tokens: u64, cached_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cached_tokens,
        }
    }

    /// Input plus output tokens
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens + rhs.input_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
            cached_tokens: self.cached_tokens + rhs.cached_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: TokenUsage) {
        *self = *self + rhs;
    }
}

impl Sum for TokenUsage {
    fn sum<I: Iterator<Item = TokenUsage>>(iter: I) -> Self {
        iter.fold(TokenUsage::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_assign() {
        let mut usage = TokenUsage::new(100, 20, 0);
        usage += TokenUsage::new(50, 10, 40);
        assert_eq!(usage, TokenUsage::new(150, 30, 40));
        assert_eq!(usage.total(), 180);
    }

    proptest! {
        /// Property: summing a batch equals summing each counter separately
        #[test]
        fn test_sum_is_fieldwise(
            counts in proptest::collection::vec((0u64..1_000_000, 0u64..100_000, 0u64..1_000_000), 0..8)
        ) {
            let usages: Vec<TokenUsage> = counts
                .iter()
                .map(|&(i, o, c)| TokenUsage::new(i, o, c))
                .collect();
            let total: TokenUsage = usages.iter().copied().sum();

            prop_assert_eq!(total.input_tokens, counts.iter().map(|c| c.0).sum::<u64>());
            prop_assert_eq!(total.output_tokens, counts.iter().map(|c| c.1).sum::<u64>());
            prop_assert_eq!(total.cached_tokens, counts.iter().map(|c| c.2).sum::<u64>());
        }
    }
}
