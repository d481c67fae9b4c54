//! Multiset combinatorics over a metal vocabulary.
//!
//! Metals are referred to by their index in the vocabulary. A multiset of size `k`
//! is a non-decreasing sequence of `k` metal indices; multisets are always
//! generated in lexicographic order, which fixes the column layout of ensemble
//! one-hot encodings and the digit order of the fingerprint enumeration.

/// Binomial coefficient `C(n, k)`, computed without intermediate overflow for the
/// zone sizes encountered in practice.
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = result * u128::from(n - i) / u128::from(i + 1);
    }
    result as u64
}

/// Number of multisets of size `size` over `n_metals` metals ("stars and bars"),
/// `C(size + n_metals - 1, size)`.
pub fn multiset_count(n_metals: usize, size: usize) -> usize {
    if n_metals == 0 {
        return usize::from(size == 0);
    }
    binomial((size + n_metals - 1) as u64, size as u64) as usize
}

/// All multisets of `size` metal indices drawn from `0..n_metals`, in lexicographic
/// order (combinations with replacement).
pub fn multisets(n_metals: usize, size: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::with_capacity(multiset_count(n_metals, size));
    if n_metals == 0 {
        if size == 0 {
            result.push(Vec::new());
        }
        return result;
    }

    let mut current = vec![0usize; size];
    loop {
        result.push(current.clone());

        let Some(pos) = current.iter().rposition(|&m| m + 1 < n_metals) else {
            break;
        };
        let next = current[pos] + 1;
        current[pos..].iter_mut().for_each(|m| *m = next);
    }
    result
}

/// Counts how often each metal index occurs in `multiset`.
pub fn count_metals(multiset: &[usize], n_metals: usize) -> Vec<u32> {
    let mut counts = vec![0u32; n_metals];
    for &metal in multiset {
        counts[metal] += 1;
    }
    counts
}

/// Number of distinct orderings of `size` atoms with the given per-metal counts:
/// the multinomial coefficient `size! / ∏ count_i!`.
pub fn multiplicity(size: usize, counts: &[u32]) -> u64 {
    debug_assert_eq!(counts.iter().map(|&c| c as usize).sum::<usize>(), size);
    let mut remaining = size as u64;
    let mut result: u64 = 1;
    for &count in counts {
        result *= binomial(remaining, u64::from(count));
        remaining -= u64::from(count);
    }
    result
}
