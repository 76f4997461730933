// SPDX-License-Identifier: Apache-2.0

use barberboard_api::SummaryCard;
use barberboard_model::{cell_month_label, plan_fact_pct, Category};
use barberboard_sheets::{SheetsBackend, SheetsError};
use std::collections::HashMap;

/// Month counts for every category against its goal. One list-sheets call
/// plus one batched fetch of the sheets that exist; categories without a
/// sheet count as zero.
pub async fn summarize(
    backend: &dyn SheetsBackend,
    spreadsheet_id: &str,
    target_month: &str,
    goals: Option<&HashMap<String, u32>>,
) -> Result<Vec<(Category, SummaryCard)>, SheetsError> {
    let titles = backend.worksheet_titles(spreadsheet_id).await?;
    let present: Vec<String> = Category::ALL
        .iter()
        .map(|category| category.sheet_name())
        .filter(|name| titles.iter().any(|t| t == name))
        .map(str::to_string)
        .collect();
    let grids = if present.is_empty() {
        Vec::new()
    } else {
        backend.batch_read_rows(spreadsheet_id, &present).await?
    };
    let by_sheet: HashMap<&str, &Vec<Vec<String>>> = present
        .iter()
        .map(String::as_str)
        .zip(grids.iter())
        .collect();

    let cards = Category::ALL
        .into_iter()
        .map(|category| {
            let schema = category.schema();
            let current = by_sheet
                .get(schema.sheet_name)
                .map(|grid| count_month_records(grid, target_month))
                .unwrap_or(0);
            let goal = goals
                .and_then(|overrides| overrides.get(schema.dashboard_key).copied())
                .unwrap_or(schema.monthly_goal);
            let card = SummaryCard {
                current,
                goal,
                percentage: plan_fact_pct(f64::from(goal), f64::from(current)),
                label: schema.dashboard_label.to_string(),
            };
            (category, card)
        })
        .collect();
    Ok(cards)
}

/// Counts data rows whose date cell falls in `target_month`. The date column
/// is `Дата отправки`, or a plain `Дата` column for sheets predating the
/// submission timestamp. Rows with missing or unparseable dates are skipped.
fn count_month_records(grid: &[Vec<String>], target_month: &str) -> u32 {
    let Some((headers, data_rows)) = grid.split_first() else {
        return 0;
    };
    let date_col = headers
        .iter()
        .position(|h| h.trim() == "Дата отправки")
        .or_else(|| headers.iter().position(|h| h.trim() == "Дата"));
    let Some(date_col) = date_col else {
        return 0;
    };
    data_rows
        .iter()
        .filter(|row| {
            row.get(date_col)
                .and_then(|cell| cell_month_label(cell))
                .as_deref()
                == Some(target_month)
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use barberboard_sheets::FakeSheets;
    use std::sync::atomic::Ordering;

    async fn seed_sheet(fake: &FakeSheets, category: Category, dates: &[&str]) {
        let mut grid: Vec<Vec<String>> = vec![category
            .schema()
            .headers
            .iter()
            .map(|h| h.to_string())
            .collect()];
        for date in dates {
            grid.push(vec![date.to_string(), "1".to_string()]);
        }
        fake.spreadsheets
            .lock()
            .await
            .get_mut("s1")
            .expect("spreadsheet")
            .sheets
            .push((category.schema().sheet_name.to_string(), grid));
    }

    async fn seeded_reviews(rows: &[&str]) -> FakeSheets {
        let fake = FakeSheets::default();
        fake.insert_spreadsheet("s1", "BarberBoard - Тверская").await;
        seed_sheet(&fake, Category::Reviews, rows).await;
        fake
    }

    fn card_for(cards: &[(Category, SummaryCard)], category: Category) -> &SummaryCard {
        &cards.iter().find(|(c, _)| *c == category).unwrap().1
    }

    #[tokio::test]
    async fn counts_only_the_target_month() {
        let fake = seeded_reviews(&[
            "2024-02-28 09:00:00",
            "2024-03-01 09:00:00",
            "2024-03-15 18:30:00",
            "2024-04-01 09:00:00",
        ])
        .await;

        let cards = summarize(&fake, "s1", "Март 2024", None).await.unwrap();
        let reviews = card_for(&cards, Category::Reviews);
        assert_eq!(reviews.current, 2);
        assert_eq!(reviews.goal, 60);
        assert_eq!(reviews.percentage, 3.3);
        assert_eq!(reviews.label, "Отзывы");
    }

    #[tokio::test]
    async fn malformed_dates_are_skipped_not_fatal() {
        let fake = seeded_reviews(&["2024-03-01 09:00:00", "вчера", "", "15.03.2024"]).await;
        let cards = summarize(&fake, "s1", "Март 2024", None).await.unwrap();
        assert_eq!(card_for(&cards, Category::Reviews).current, 1);
    }

    #[tokio::test]
    async fn absent_sheets_count_as_zero() {
        let fake = FakeSheets::default();
        fake.insert_spreadsheet("s1", "BarberBoard - Тверская").await;
        let cards = summarize(&fake, "s1", "Март 2024", None).await.unwrap();
        assert_eq!(cards.len(), 7);
        for (_, card) in &cards {
            assert_eq!(card.current, 0);
            assert_eq!(card.percentage, 0.0);
        }
    }

    #[tokio::test]
    async fn goal_overrides_apply_by_dashboard_key() {
        let fake = seeded_reviews(&["2024-03-01 09:00:00", "2024-03-02 09:00:00"]).await;
        let goals = HashMap::from([("reviews".to_string(), 4_u32)]);

        let cards = summarize(&fake, "s1", "Март 2024", Some(&goals)).await.unwrap();
        let reviews = card_for(&cards, Category::Reviews);
        assert_eq!(reviews.goal, 4);
        assert_eq!(reviews.percentage, 50.0);
        // Untouched categories keep their standing goals.
        assert_eq!(card_for(&cards, Category::MorningEvents).goal, 16);
    }

    #[tokio::test]
    async fn zero_goal_override_never_divides() {
        let fake = seeded_reviews(&["2024-03-01 09:00:00"]).await;
        let goals = HashMap::from([("reviews".to_string(), 0_u32)]);
        let cards = summarize(&fake, "s1", "Март 2024", Some(&goals)).await.unwrap();
        let reviews = card_for(&cards, Category::Reviews);
        assert_eq!(reviews.current, 1);
        assert_eq!(reviews.percentage, 0.0);
    }

    #[tokio::test]
    async fn one_titles_call_and_one_batch_fetch() {
        let fake = seeded_reviews(&["2024-03-01 09:00:00"]).await;
        seed_sheet(&fake, Category::MorningEvents, &["2024-03-05 09:00:00"]).await;

        summarize(&fake, "s1", "Март 2024", None).await.unwrap();
        assert_eq!(fake.titles_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.batch_read_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.read_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn falls_back_to_plain_date_column() {
        let grid = vec![
            vec!["Дата".to_string(), "Комментарий".to_string()],
            vec!["2024-03-10".to_string(), "ок".to_string()],
            vec!["2024-04-10".to_string(), "ок".to_string()],
        ];
        assert_eq!(count_month_records(&grid, "Март 2024"), 1);
    }

    #[test]
    fn header_only_and_empty_grids_count_zero() {
        assert_eq!(count_month_records(&[], "Март 2024"), 0);
        let grid = vec![vec!["Дата отправки".to_string()]];
        assert_eq!(count_month_records(&grid, "Март 2024"), 0);
    }
}
