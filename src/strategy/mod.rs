//! Ordering strategies for candidate gateways.
//!
//! A strategy decides the order in which configured gateways are tried
//! during one send. Implement `Strategy` and pass it to
//! `Dispatcher::with_strategy` to plug in a custom order.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::config::StrategyKind;

/// Pure permutation over candidate gateway names.
///
/// `apply` must return the same names it was given (same multiset, same
/// length) and must not mutate the input. Randomized strategies draw
/// fresh randomness on every call.
pub trait Strategy: Send + Sync {
    /// Returns the name of this strategy.
    fn name(&self) -> &'static str;

    /// Produce the attempt order for one send call.
    fn apply(&self, gateways: &[String]) -> Vec<String>;
}

/// Keeps candidates in their configured order.
pub struct OrderStrategy;

impl Strategy for OrderStrategy {
    fn name(&self) -> &'static str {
        "order"
    }

    fn apply(&self, gateways: &[String]) -> Vec<String> {
        gateways.to_vec()
    }
}

/// Shuffles candidates uniformly on every call.
pub struct RandomStrategy;

impl Strategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn apply(&self, gateways: &[String]) -> Vec<String> {
        let mut ordered = gateways.to_vec();
        ordered.shuffle(&mut thread_rng());
        ordered
    }
}

/// The built-in strategy for a configured kind.
pub fn for_kind(kind: StrategyKind) -> Arc<dyn Strategy> {
    match kind {
        StrategyKind::Order => Arc::new(OrderStrategy),
        StrategyKind::Random => Arc::new(RandomStrategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_order_is_identity() {
        let input = names(&["a", "b", "c"]);
        assert_eq!(OrderStrategy.apply(&input), input);
    }

    #[test]
    fn test_order_does_not_mutate_input() {
        let input = names(&["a", "b", "c"]);
        let before = input.clone();
        let _ = OrderStrategy.apply(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn test_random_is_permutation() {
        let input = names(&["a", "b", "c", "d", "e"]);
        let output = RandomStrategy.apply(&input);

        assert_eq!(output.len(), input.len());
        let expected: HashSet<_> = input.iter().collect();
        let actual: HashSet<_> = output.iter().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_random_does_not_mutate_input() {
        let input = names(&["a", "b", "c", "d"]);
        let before = input.clone();
        let _ = RandomStrategy.apply(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn test_random_produces_different_orders() {
        // Five elements have 120 permutations; one hundred draws landing
        // on a single order would mean the shuffle is broken.
        let input = names(&["a", "b", "c", "d", "e"]);
        let orders: HashSet<Vec<String>> = (0..100).map(|_| RandomStrategy.apply(&input)).collect();
        assert!(orders.len() > 1);
    }

    #[test]
    fn test_random_empty_input() {
        let output = RandomStrategy.apply(&[]);
        assert!(output.is_empty());
    }

    #[test]
    fn test_for_kind_selects_builtin() {
        assert_eq!(for_kind(StrategyKind::Order).name(), "order");
        assert_eq!(for_kind(StrategyKind::Random).name(), "random");
    }

    #[test]
    fn test_custom_strategy() {
        struct Reverse;
        impl Strategy for Reverse {
            fn name(&self) -> &'static str {
                "reverse"
            }
            fn apply(&self, gateways: &[String]) -> Vec<String> {
                let mut ordered = gateways.to_vec();
                ordered.reverse();
                ordered
            }
        }

        let input = names(&["a", "b", "c"]);
        assert_eq!(Reverse.apply(&input), names(&["c", "b", "a"]));
    }
}
