//! Fuzzy name similarity used to rank repology projects.

/// Levenshtein similarity ratio in `[0, 1]`, with substitutions costing 2.
///
/// `((|a| + |b|) - distance) / (|a| + |b|)`. Identical strings score 1.0.
pub fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // Single rolling row over `b`.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = if ca == cb { 0 } else { 2 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + substitution);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let distance = prev[b.len()];

    (total - distance) as f64 / total as f64
}
