//! Template data for each use case.
//!
//! Each function turns a (possibly truncated) subset of inputs into the
//! JSON object its template expects. Output is deterministic for a given
//! subset so rendered prompts, and therefore cache keys, are stable.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::types::{Expense, JournalEntry};

pub(crate) fn entry_lines(entries: &[&JournalEntry]) -> Vec<String> {
    entries.iter().map(|e| format_entry(e)).collect()
}

fn format_entry(entry: &JournalEntry) -> String {
    let mut header = entry.date.to_string();
    if let Some(location) = &entry.location {
        header.push_str(" | ");
        header.push_str(location);
    }
    if let Some(title) = &entry.title {
        header.push_str(" | ");
        header.push_str(title);
    }
    format!("[{header}]\n{}\n", entry.body.trim())
}

/// Distinct locations in order of first appearance.
pub(crate) fn distinct_locations<'a>(entries: impl IntoIterator<Item = &'a JournalEntry>) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for entry in entries {
        if let Some(location) = entry.location.as_deref() {
            let location = location.trim();
            if !location.is_empty() && !seen.contains(&location) {
                seen.push(location);
            }
        }
    }
    seen
}

/// Location named by the most entries; ties go to the one seen first.
pub(crate) fn most_visited<'a>(entries: impl IntoIterator<Item = &'a JournalEntry>) -> Option<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for entry in entries {
        let Some(location) = entry.location.as_deref().map(str::trim) else {
            continue;
        };
        if location.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(l, _)| *l == location) {
            Some((_, n)) => *n += 1,
            None => counts.push((location, 1)),
        }
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(&str, usize)>, (l, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((l, n)),
        })
}

pub(crate) fn date_range(entries: &[&JournalEntry]) -> String {
    let first = entries.iter().map(|e| e.date).min();
    let last = entries.iter().map(|e| e.date).max();
    match (first, last) {
        (Some(a), Some(b)) if a == b => a.to_string(),
        (Some(a), Some(b)) => format!("{a} and {b}"),
        _ => String::new(),
    }
}

pub(crate) fn join_places(places: &[&str]) -> String {
    match places {
        [] => "various places".to_string(),
        [one] => (*one).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

pub(crate) fn summary(entries: &[&JournalEntry]) -> Value {
    json!({
        "entry_count": entries.len(),
        "date_range": date_range(entries),
        "locations": join_places(&distinct_locations(entries.iter().copied())),
        "entries": entry_lines(entries),
    })
}

pub(crate) fn reflective(entries: &[&JournalEntry], question_count: usize) -> Value {
    json!({
        "entries": entry_lines(entries),
        "question_count": question_count,
    })
}

pub(crate) fn metadata(entries: &[&JournalEntry]) -> Value {
    json!({ "entries": entry_lines(entries) })
}

pub(crate) fn places(entries: &[&JournalEntry], recommendation_count: usize) -> Value {
    let mut visited = distinct_locations(entries.iter().copied());
    if visited.is_empty() {
        visited.push("nothing recorded yet");
    }
    let destination = most_visited(entries.iter().copied())
        .map(|(l, _)| l.to_string())
        .unwrap_or_else(|| "their destination".to_string());
    json!({
        "destination": destination,
        "visited": visited,
        "entries": entry_lines(entries),
        "recommendation_count": recommendation_count,
    })
}

/// Totals keyed by (category, currency), in key order.
pub(crate) fn category_totals<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> BTreeMap<(&'a str, &'a str), f64> {
    let mut totals = BTreeMap::new();
    for expense in expenses {
        *totals
            .entry((expense.category.as_str(), expense.currency.as_str()))
            .or_insert(0.0) += expense.amount;
    }
    totals
}

pub(crate) fn expenses(expenses: &[&Expense]) -> Value {
    let lines: Vec<String> = expenses
        .iter()
        .map(|e| {
            format!(
                "{} | {} | {} | {:.2} {}",
                e.date, e.category, e.description, e.amount, e.currency
            )
        })
        .collect();
    let totals: Vec<String> = category_totals(expenses.iter().copied())
        .into_iter()
        .map(|((category, currency), amount)| format!("{category}: {amount:.2} {currency}"))
        .collect();
    json!({
        "expense_count": expenses.len(),
        "expenses": lines,
        "totals": totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[test]
    fn most_visited_prefers_count_then_first_seen() {
        let entries = [
            JournalEntry::new(day(1), "a").location("Osaka"),
            JournalEntry::new(day(2), "b").location("Kyoto"),
            JournalEntry::new(day(3), "c").location("Kyoto"),
            JournalEntry::new(day(4), "d"),
        ];
        assert_eq!(most_visited(&entries), Some(("Kyoto", 2)));
        assert_eq!(distinct_locations(&entries), vec!["Osaka", "Kyoto"]);

        let tied = [
            JournalEntry::new(day(1), "a").location("Nara"),
            JournalEntry::new(day(2), "b").location("Kobe"),
        ];
        assert_eq!(most_visited(&tied), Some(("Nara", 1)));
    }

    #[test]
    fn places_are_joined_readably() {
        assert_eq!(join_places(&[]), "various places");
        assert_eq!(join_places(&["Kyoto"]), "Kyoto");
        assert_eq!(join_places(&["Kyoto", "Nara", "Osaka"]), "Kyoto, Nara and Osaka");
    }

    #[test]
    fn totals_group_by_category_and_currency() {
        let expenses = [
            Expense::new(day(1), "ramen", "Food", 1200.0, "JPY"),
            Expense::new(day(2), "sushi", "Food", 3000.0, "JPY"),
            Expense::new(day(2), "coffee", "Food", 4.5, "EUR"),
        ];
        let totals = category_totals(&expenses);
        assert_eq!(totals[&("Food", "JPY")], 4200.0);
        assert_eq!(totals[&("Food", "EUR")], 4.5);
    }
}
