//! Summary figures derived from the expenses the client currently holds.

use std::fmt::Write as _;

use chrono::{Datelike, NaiveDate};

use crate::structs::{Category, Expense};

pub fn total_spent(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

/// Sum over expenses dated in the same calendar month and year as `today`.
/// Undated expenses never count.
pub fn month_spent(expenses: &[Expense], today: NaiveDate) -> f64 {
    expenses
        .iter()
        .filter(|e| {
            e.date
                .is_some_and(|d| d.month() == today.month() && d.year() == today.year())
        })
        .map(|e| e.amount)
        .sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// The stored label, which may be outside the known set.
    pub category: String,
    pub total: f64,
}

impl CategoryTotal {
    pub fn presentation(&self) -> Category {
        Category::from_label(&self.category)
    }
}

/// Totals keyed by literal category string, in order of first appearance.
pub fn category_totals(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for expense in expenses {
        match totals.iter_mut().find(|t| t.category == expense.category) {
            Some(entry) => entry.total += expense.amount,
            None => totals.push(CategoryTotal {
                category: expense.category.clone(),
                total: expense.amount,
            }),
        }
    }
    totals
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBar {
    pub category: String,
    pub total: f64,
    /// Share of the largest category total, 0..=100.
    pub percent: f64,
    pub icon: &'static str,
    pub color: &'static str,
}

pub fn category_bars(totals: &[CategoryTotal]) -> Vec<CategoryBar> {
    let max = totals.iter().map(|t| t.total).fold(1.0_f64, f64::max);
    totals
        .iter()
        .map(|t| {
            let look = t.presentation();
            CategoryBar {
                category: t.category.clone(),
                total: t.total,
                percent: t.total / max * 100.0,
                icon: look.icon(),
                color: look.color(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_spent: f64,
    pub month_spent: f64,
    pub transactions: usize,
    pub categories: Vec<CategoryBar>,
}

impl Summary {
    pub fn compute(expenses: &[Expense], today: NaiveDate) -> Self {
        Self {
            total_spent: total_spent(expenses),
            month_spent: month_spent(expenses, today),
            transactions: expenses.len(),
            categories: category_bars(&category_totals(expenses)),
        }
    }

    /// Plain-text dashboard for the terminal.
    pub fn render(&self) -> String {
        const BAR_WIDTH: f64 = 30.0;
        let mut out = String::new();
        let _ = writeln!(out, "Total Spent   {}", self.total_spent);
        let _ = writeln!(out, "This Month    {}", self.month_spent);
        let _ = writeln!(out, "Transactions  {}", self.transactions);
        let _ = writeln!(out);
        if self.categories.is_empty() {
            let _ = writeln!(out, "Add a few expenses to see category breakdown.");
            return out;
        }
        let _ = writeln!(out, "Spending by Category");
        for bar in &self.categories {
            let filled = (bar.percent / 100.0 * BAR_WIDTH).round().clamp(0.0, BAR_WIDTH) as usize;
            let _ = writeln!(
                out,
                "  [{:<16}] {:<14} {:>10}  {}",
                bar.icon,
                bar.category,
                bar.total,
                "#".repeat(filled)
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn expense(category: &str, amount: f64, date: Option<NaiveDate>) -> Expense {
        Expense {
            id: 0,
            user_id: 1,
            title: "x".into(),
            amount,
            category: category.into(),
            date,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn totals_over_empty_list() {
        let summary = Summary::compute(&[], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(summary.total_spent, 0.0);
        assert_eq!(summary.month_spent, 0.0);
        assert_eq!(summary.transactions, 0);
        assert!(summary.categories.is_empty());
    }

    #[test]
    fn month_spent_matches_month_and_year() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let expenses = vec![
            expense("Food", 10.0, ymd(2024, 3, 1)),
            expense("Food", 20.0, ymd(2024, 3, 31)),
            expense("Food", 40.0, ymd(2023, 3, 10)),
            expense("Food", 80.0, ymd(2024, 2, 29)),
            expense("Food", 160.0, None),
        ];
        assert_eq!(month_spent(&expenses, today), 30.0);
        assert_eq!(total_spent(&expenses), 310.0);
    }

    #[test]
    fn unknown_categories_keep_their_own_bucket() {
        let expenses = vec![
            expense("Crypto", 5.0, None),
            expense("Other", 3.0, None),
            expense("Crypto", 2.0, None),
        ];
        let totals = category_totals(&expenses);
        assert_eq!(
            totals,
            vec![
                CategoryTotal { category: "Crypto".into(), total: 7.0 },
                CategoryTotal { category: "Other".into(), total: 3.0 },
            ]
        );
        assert_eq!(totals[0].presentation(), Category::Other);
    }

    #[rstest]
    #[case(vec![expense("Food", 1.5, None)])]
    #[case(vec![expense("Food", 12.0, None), expense("Bills", 100.0, None), expense("Food", 3.0, None)])]
    #[case(vec![expense("Transport", 7.0, None), expense("Weird", 0.25, None), expense("Shopping", 99.0, None)])]
    fn category_totals_sum_to_total_spent(#[case] expenses: Vec<Expense>) {
        let by_category: f64 = category_totals(&expenses).iter().map(|t| t.total).sum();
        assert!((by_category - total_spent(&expenses)).abs() < 1e-9);
    }

    #[test]
    fn bars_scale_against_largest_total() {
        let totals = vec![
            CategoryTotal { category: "Food".into(), total: 50.0 },
            CategoryTotal { category: "Bills".into(), total: 200.0 },
        ];
        let bars = category_bars(&totals);
        assert_eq!(bars[0].percent, 25.0);
        assert_eq!(bars[1].percent, 100.0);
        assert_eq!(bars[0].color, "#22c55e");
    }

    #[test]
    fn bar_denominator_is_at_least_one() {
        let totals = vec![CategoryTotal { category: "Food".into(), total: 0.5 }];
        assert_eq!(category_bars(&totals)[0].percent, 50.0);
    }

    #[test]
    fn render_lists_each_category() {
        let expenses = vec![expense("Food", 5.0, None), expense("Bills", 10.0, None)];
        let text = Summary::compute(&expenses, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).render();
        assert!(text.contains("Total Spent   15"));
        assert!(text.contains("Food"));
        assert!(text.contains("Bills"));
    }
}
