//! Emotion and driver frequency aggregation
//!
//! Pure counting helpers shared by the granular analytics and strategic
//! summary endpoints. Ties break deterministically: highest count first,
//! then lexicographically smallest name.

use std::collections::HashMap;

/// Most frequent emotion, or `None` when the input holds no emotions
pub fn dominant_emotion<'a, I>(emotions: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    rank_by_frequency(emotions).into_iter().next()
}

/// The `n` most frequent drivers, most frequent first
pub fn top_drivers<'a, I>(drivers: I, n: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ranked = rank_by_frequency(drivers);
    ranked.truncate(n);
    ranked
}

fn rank_by_frequency<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().map(|(value, _)| value.to_string()).collect()
}
