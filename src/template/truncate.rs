//! Deterministic input truncation for oversized prompts.
//!
//! When the rendered prompt for a full input set exceeds the budget, the
//! analyst keeps a representative subset instead of failing. Inputs are
//! first ordered by date (stable on the caller's order), so the same set
//! and budget always select the same records.

use serde::{Deserialize, Serialize};

use crate::types::Dated;

use super::estimate_length;

/// How to pick a subset of `n` records from a chronological list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationStrategy {
    /// The `n` latest records.
    #[default]
    MostRecent,
    /// `n` records spread evenly from first to last.
    EvenlySampled,
}

/// Order records by date, keeping the caller's order for equal dates.
pub fn chronological<T: Dated>(items: &[T]) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by_key(|item| item.date());
    sorted
}

/// Pick `n` records from an already ordered list.
pub fn select<'a, T>(items: &[&'a T], n: usize, strategy: TruncationStrategy) -> Vec<&'a T> {
    let len = items.len();
    if n >= len {
        return items.to_vec();
    }
    if n == 0 {
        return Vec::new();
    }
    match strategy {
        TruncationStrategy::MostRecent => items[len - n..].to_vec(),
        TruncationStrategy::EvenlySampled if n == 1 => vec![items[len - 1]],
        TruncationStrategy::EvenlySampled => (0..n)
            .map(|i| items[i * (len - 1) / (n - 1)])
            .collect(),
    }
}

/// Render the largest subset whose prompt fits `budget`.
///
/// `render` turns a subset into prompt text. Returns the prompt and how many
/// records it covers. If not even a single record fits, the single most
/// representative record is used anyway.
pub fn fit_to_budget<'a, T, E, F>(
    items: &[&'a T],
    budget: usize,
    strategy: TruncationStrategy,
    mut render: F,
) -> Result<(String, usize), E>
where
    F: FnMut(&[&'a T]) -> Result<String, E>,
{
    let full = render(items)?;
    if items.len() <= 1 || estimate_length(&full) <= budget {
        return Ok((full, items.len()));
    }

    // Largest n in [1, len) that fits; `best` keeps the last fitting render.
    let (mut lo, mut hi) = (1usize, items.len() - 1);
    let mut best: Option<(String, usize)> = None;
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let prompt = render(&select(items, mid, strategy))?;
        if estimate_length(&prompt) <= budget {
            best = Some((prompt, mid));
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }

    match best {
        Some(found) => Ok(found),
        None => Ok((render(&select(items, 1, strategy))?, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Debug, PartialEq)]
    struct Rec(u32, NaiveDate);

    impl Dated for Rec {
        fn date(&self) -> NaiveDate {
            self.1
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn recs() -> Vec<Rec> {
        (1..=10).map(|i| Rec(i, day(i))).collect()
    }

    fn ids(items: &[&Rec]) -> Vec<u32> {
        items.iter().map(|r| r.0).collect()
    }

    #[test]
    fn chronological_is_stable() {
        let items = vec![Rec(1, day(3)), Rec(2, day(1)), Rec(3, day(3)), Rec(4, day(2))];
        assert_eq!(ids(&chronological(&items)), vec![2, 4, 1, 3]);
    }

    #[test]
    fn most_recent_takes_tail() {
        let items = recs();
        let sorted = chronological(&items);
        assert_eq!(ids(&select(&sorted, 3, TruncationStrategy::MostRecent)), vec![8, 9, 10]);
    }

    #[test]
    fn evenly_sampled_spans_range() {
        let items = recs();
        let sorted = chronological(&items);
        assert_eq!(
            ids(&select(&sorted, 4, TruncationStrategy::EvenlySampled)),
            vec![1, 4, 7, 10]
        );
    }

    #[test]
    fn select_more_than_available_returns_all() {
        let items = recs();
        let sorted = chronological(&items);
        assert_eq!(select(&sorted, 50, TruncationStrategy::MostRecent).len(), 10);
    }

    fn render(items: &[&Rec]) -> Result<String, ()> {
        Ok(items
            .iter()
            .map(|r| format!("record number {:02} with some text", r.0))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    #[test]
    fn fit_keeps_everything_when_under_budget() {
        let items = recs();
        let sorted = chronological(&items);
        let (_, n) = fit_to_budget(&sorted, 10_000, TruncationStrategy::MostRecent, render).unwrap();
        assert_eq!(n, 10);
    }

    #[test]
    fn fit_shrinks_to_budget_deterministically() {
        let items = recs();
        let sorted = chronological(&items);
        let budget = 30;
        let (a, n) = fit_to_budget(&sorted, budget, TruncationStrategy::EvenlySampled, render).unwrap();
        let (b, m) = fit_to_budget(&sorted, budget, TruncationStrategy::EvenlySampled, render).unwrap();
        assert!(n < 10);
        assert!(estimate_length(&a) <= budget);
        assert_eq!(a, b);
        assert_eq!(n, m);
    }

    #[test]
    fn fit_falls_back_to_one_record() {
        let items = recs();
        let sorted = chronological(&items);
        let (prompt, n) = fit_to_budget(&sorted, 1, TruncationStrategy::MostRecent, render).unwrap();
        assert_eq!(n, 1);
        assert!(prompt.contains("10"));
    }
}
