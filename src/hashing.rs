//! Dense indices for combinations of coarse-grained site types.
//!
//! Types are 1-based. Pair interactions are unordered. Three-body tuples are
//! written in chain order `[end, center, end]` with unordered ends. Four-body
//! tuples are chain-ordered `[a, b, c, d]`, and a chain and its reverse map to
//! the same index. Each hash is a bijection onto `0..count` for its body count.

/// Number of unordered type pairs, `n(n+1)/2`.
pub fn n_distinct_pairs(n_types: usize) -> usize {
    n_types * (n_types + 1) / 2
}

/// Number of distinct angle-like triples, `n · n(n+1)/2`.
pub fn n_distinct_triples(n_types: usize) -> usize {
    n_types * n_distinct_pairs(n_types)
}

/// Number of distinct chain quadruples up to reversal, `n²(n²+1)/2`.
pub fn n_distinct_quadruples(n_types: usize) -> usize {
    n_distinct_pairs(n_types * n_types)
}

fn pair_row_start(row: usize, n_types: usize) -> usize {
    row * (2 * n_types - row + 1) / 2
}

pub fn pair_hash(a: usize, b: usize, n_types: usize) -> usize {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    pair_row_start(lo - 1, n_types) + (hi - lo)
}

pub fn triple_hash(end1: usize, center: usize, end2: usize, n_types: usize) -> usize {
    (center - 1) * n_distinct_pairs(n_types) + pair_hash(end1, end2, n_types)
}

pub fn quadruple_hash(a: usize, b: usize, c: usize, d: usize, n_types: usize) -> usize {
    let forward = (a - 1) * n_types + b;
    let backward = (d - 1) * n_types + c;
    pair_hash(forward, backward, n_types * n_types)
}

/// Inverse of [`pair_hash`]; returns the pair with the smaller type first.
pub fn invert_pair_hash(hash: usize, n_types: usize) -> [usize; 2] {
    let mut row = 0;
    while row + 1 < n_types && pair_row_start(row + 1, n_types) <= hash {
        row += 1;
    }
    let lo = row + 1;
    [lo, lo + hash - pair_row_start(row, n_types)]
}

/// Inverse of [`triple_hash`] in chain order `[end, center, end]`.
pub fn invert_triple_hash(hash: usize, n_types: usize) -> [usize; 3] {
    let n_pairs = n_distinct_pairs(n_types);
    let center = hash / n_pairs + 1;
    let [e1, e2] = invert_pair_hash(hash % n_pairs, n_types);
    [e1, center, e2]
}

/// Inverse of [`quadruple_hash`] in chain order `[a, b, c, d]`.
pub fn invert_quadruple_hash(hash: usize, n_types: usize) -> [usize; 4] {
    let [forward, backward] = invert_pair_hash(hash, n_types * n_types);
    let (p, q) = (forward - 1, backward - 1);
    [p / n_types + 1, p % n_types + 1, q % n_types + 1, q / n_types + 1]
}

/// Hash of a type tuple of any supported body count.
///
/// Returns `None` for unsupported lengths or for types outside `1..=n_types`.
pub fn interaction_hash(types: &[usize], n_types: usize) -> Option<usize> {
    if types.iter().any(|&t| t == 0 || t > n_types) {
        return None;
    }
    match *types {
        [a, b] => Some(pair_hash(a, b, n_types)),
        [a, center, b] => Some(triple_hash(a, center, b, n_types)),
        [a, b, c, d] => Some(quadruple_hash(a, b, c, d, n_types)),
        _ => None,
    }
}

/// Inverse of [`interaction_hash`] for the given body count.
pub fn invert_interaction_hash(hash: usize, n_body: usize, n_types: usize) -> Vec<usize> {
    match n_body {
        2 => invert_pair_hash(hash, n_types).to_vec(),
        3 => invert_triple_hash(hash, n_types).to_vec(),
        4 => invert_quadruple_hash(hash, n_types).to_vec(),
        _ => Vec::new(),
    }
}

/// Number of possible type combinations for the given body count.
pub fn n_possible(n_body: usize, n_types: usize) -> usize {
    match n_body {
        2 => n_distinct_pairs(n_types),
        3 => n_distinct_triples(n_types),
        4 => n_distinct_quadruples(n_types),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn pair_hash_layout_for_two_types() {
        assert_eq!(pair_hash(1, 1, 2), 0);
        assert_eq!(pair_hash(1, 2, 2), 1);
        assert_eq!(pair_hash(2, 1, 2), 1);
        assert_eq!(pair_hash(2, 2, 2), 2);
        assert_eq!(n_distinct_pairs(2), 3);
    }

    #[test]
    fn pair_hash_is_bijective() {
        let n = 5;
        let mut seen = HashSet::new();
        for a in 1..=n {
            for b in a..=n {
                let h = pair_hash(a, b, n);
                assert!(h < n_distinct_pairs(n));
                assert!(seen.insert(h));
                assert_eq!(invert_pair_hash(h, n), [a, b]);
            }
        }
        assert_eq!(seen.len(), n_distinct_pairs(n));
    }

    #[test]
    fn triple_hash_ignores_end_order() {
        let n = 4;
        assert_eq!(triple_hash(1, 3, 2, n), triple_hash(2, 3, 1, n));
        assert_ne!(triple_hash(1, 3, 2, n), triple_hash(3, 1, 2, n));
    }

    #[test]
    fn triple_hash_is_bijective() {
        let n = 3;
        let mut seen = HashSet::new();
        for center in 1..=n {
            for a in 1..=n {
                for b in a..=n {
                    let h = triple_hash(a, center, b, n);
                    assert!(seen.insert(h));
                    assert_eq!(invert_triple_hash(h, n), [a, center, b]);
                }
            }
        }
        assert_eq!(seen.len(), n_distinct_triples(n));
        assert!(seen.iter().all(|&h| h < n_distinct_triples(n)));
    }

    #[test]
    fn quadruple_hash_matches_reversed_chain() {
        let n = 3;
        assert_eq!(quadruple_hash(1, 2, 3, 1, n), quadruple_hash(1, 3, 2, 1, n));
        assert_eq!(quadruple_hash(2, 1, 1, 3, n), quadruple_hash(3, 1, 1, 2, n));
        assert_ne!(quadruple_hash(1, 2, 3, 1, n), quadruple_hash(2, 1, 3, 1, n));
    }

    #[test]
    fn quadruple_hash_is_bijective_up_to_reversal() {
        let n = 3;
        let mut seen = HashSet::new();
        for a in 1..=n {
            for b in 1..=n {
                for c in 1..=n {
                    for d in 1..=n {
                        let h = quadruple_hash(a, b, c, d, n);
                        assert!(h < n_distinct_quadruples(n));
                        seen.insert(h);
                        let inv = invert_quadruple_hash(h, n);
                        let reversed = [d, c, b, a];
                        assert!(inv == [a, b, c, d] || inv == reversed);
                        assert_eq!(quadruple_hash(inv[0], inv[1], inv[2], inv[3], n), h);
                    }
                }
            }
        }
        assert_eq!(seen.len(), n_distinct_quadruples(n));
    }

    #[test]
    fn generic_hash_dispatches_on_length() {
        let n = 3;
        assert_eq!(interaction_hash(&[2, 1], n), Some(pair_hash(1, 2, n)));
        assert_eq!(
            interaction_hash(&[1, 2, 3], n),
            Some(triple_hash(1, 2, 3, n))
        );
        assert_eq!(
            interaction_hash(&[1, 2, 3, 1], n),
            Some(quadruple_hash(1, 2, 3, 1, n))
        );
        assert_eq!(interaction_hash(&[1], n), None);
        assert_eq!(interaction_hash(&[0, 1], n), None);
        assert_eq!(interaction_hash(&[1, 4], n), None);
    }

    #[test]
    fn generic_inverse_round_trips() {
        let n = 4;
        for n_body in 2..=4 {
            for h in 0..n_possible(n_body, n) {
                let types = invert_interaction_hash(h, n_body, n);
                assert_eq!(types.len(), n_body);
                assert_eq!(interaction_hash(&types, n), Some(h));
            }
        }
    }
}
