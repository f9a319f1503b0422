//! Locally computed results for when no provider can answer, and the canned
//! answers for empty input.

use crate::types::{EntryMetadata, Expense, ExpenseReport, JournalEntry, PlaceRecommendation};

use super::prompts::{category_totals, date_range, distinct_locations, join_places, most_visited};

pub(crate) const EMPTY_SUMMARY: &str =
    "No journal entries yet. Write your first entry and a summary of your trip will appear here.";

pub(crate) const EMPTY_EXPENSES: &str = "No expenses recorded yet.";

const STARTER_QUESTIONS: &[&str] = &[
    "Where are you heading first, and what are you hoping to find there?",
    "What do you want to remember most about this trip when you look back?",
    "What made you choose this destination?",
];

const GENERIC_QUESTIONS: &[&str] = &[
    "Which moment from these days would you most like to relive, and why?",
    "What surprised you most about the places you visited?",
    "Who did you meet along the way, and what did you learn from them?",
    "How has your sense of home shifted since you set out?",
    "What would you do differently if you returned tomorrow?",
    "Which small sensory detail keeps coming back to you?",
];

pub(crate) fn starter_questions() -> Vec<String> {
    STARTER_QUESTIONS.iter().map(|q| (*q).to_string()).collect()
}

pub(crate) fn summary(entries: &[JournalEntry]) -> String {
    let refs: Vec<&JournalEntry> = entries.iter().collect();
    let places = join_places(&distinct_locations(entries));
    let noun = if entries.len() == 1 { "entry" } else { "entries" };
    let range = date_range(&refs);
    if refs.iter().all(|e| e.date == refs[0].date) {
        format!("You wrote {} {noun} on {range} in {places}.", entries.len())
    } else {
        format!("You wrote {} {noun} between {range} in {places}.", entries.len())
    }
}

pub(crate) fn reflective_questions(entries: &[JournalEntry], count: usize) -> Vec<String> {
    let mut questions = Vec::with_capacity(count);
    if let Some((place, _)) = most_visited(entries) {
        questions.push(format!("What about {place} would you tell a friend who has never been?"));
    }
    questions.extend(GENERIC_QUESTIONS.iter().map(|q| (*q).to_string()));
    questions.truncate(count.max(1));
    questions
}

pub(crate) fn metadata(entries: &[JournalEntry]) -> EntryMetadata {
    EntryMetadata {
        places: distinct_locations(entries)
            .into_iter()
            .map(str::to_string)
            .collect(),
        ..EntryMetadata::default()
    }
}

pub(crate) fn places(entries: &[JournalEntry]) -> Vec<PlaceRecommendation> {
    match most_visited(entries) {
        Some((place, visits)) => vec![PlaceRecommendation {
            name: place.to_string(),
            category: Some("revisit".to_string()),
            reason: format!(
                "You wrote about {place} in {visits} {}; there is likely more of it left to explore.",
                if visits == 1 { "entry" } else { "entries" }
            ),
        }],
        None => Vec::new(),
    }
}

pub(crate) fn expenses(expenses: &[Expense]) -> ExpenseReport {
    let totals = category_totals(expenses);
    let first = expenses.iter().map(|e| e.date).min();
    let last = expenses.iter().map(|e| e.date).max();
    let noun = if expenses.len() == 1 { "expense" } else { "expenses" };
    let summary = match (first, last) {
        (Some(a), Some(b)) if a != b => {
            format!("{} {noun} recorded between {a} and {b}.", expenses.len())
        }
        (Some(a), _) => format!("{} {noun} recorded on {a}.", expenses.len()),
        _ => EMPTY_EXPENSES.to_string(),
    };

    let highlights = totals
        .iter()
        .map(|((category, currency), amount)| format!("{category}: {amount:.2} {currency}"))
        .collect();

    // Amounts in different currencies are never compared with each other.
    let mut top: Vec<(&str, &str, f64)> = Vec::new();
    for (&(category, currency), &amount) in &totals {
        match top.iter_mut().find(|(_, c, _)| *c == currency) {
            Some(slot) if slot.2 < amount => *slot = (category, currency, amount),
            Some(_) => {}
            None => top.push((category, currency, amount)),
        }
    }
    let suggestions = top
        .into_iter()
        .map(|(category, currency, amount)| {
            format!("{category} is your largest {currency} spend ({amount:.2}); look there first for savings.")
        })
        .collect();

    ExpenseReport {
        summary,
        highlights,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[test]
    fn summary_mentions_count_span_and_places() {
        let entries = vec![
            JournalEntry::new(day(1), "temples").location("Kyoto, Japan"),
            JournalEntry::new(day(3), "deer").location("Nara, Japan"),
        ];
        assert_eq!(
            summary(&entries),
            "You wrote 2 entries between 2024-04-01 and 2024-04-03 in Kyoto, Japan and Nara, Japan."
        );
    }

    #[test]
    fn summary_of_one_day_names_the_date() {
        let entries = vec![
            JournalEntry::new(day(2), "tea").location("Kyoto, Japan"),
            JournalEntry::new(day(2), "gion").location("Kyoto, Japan"),
        ];
        assert_eq!(summary(&entries), "You wrote 2 entries on 2024-04-02 in Kyoto, Japan.");
    }

    #[test]
    fn questions_respect_count() {
        let entries = vec![JournalEntry::new(day(1), "x").location("Lisbon")];
        let qs = reflective_questions(&entries, 3);
        assert_eq!(qs.len(), 3);
        assert!(qs[0].contains("Lisbon"));
    }

    #[test]
    fn places_suggest_revisiting_most_visited() {
        let entries = vec![
            JournalEntry::new(day(1), "a").location("Porto"),
            JournalEntry::new(day(2), "b").location("Lisbon"),
            JournalEntry::new(day(3), "c").location("Lisbon"),
        ];
        let recs = places(&entries);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].name, "Lisbon");
    }

    #[test]
    fn expense_report_groups_per_currency() {
        let list = vec![
            Expense::new(day(1), "hostel", "Lodging", 60.0, "EUR"),
            Expense::new(day(1), "bifana", "Food", 4.0, "EUR"),
            Expense::new(day(2), "museum", "Culture", 1500.0, "JPY"),
        ];
        let report = expenses(&list);
        assert_eq!(report.summary, "3 expenses recorded between 2024-04-01 and 2024-04-02.");
        assert_eq!(report.highlights.len(), 3);
        assert_eq!(report.suggestions.len(), 2);
        assert!(report.suggestions.iter().any(|s| s.starts_with("Lodging")));
    }
}
