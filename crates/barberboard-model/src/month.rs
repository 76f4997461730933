use chrono::{Datelike, Local, NaiveDate};

/// Display months, indexed by calendar month minus one. Month labels are a
/// fixed lookup, not a locale feature, so they stay stable across hosts.
pub const MONTHS_RU: [&str; 12] = [
    "Январь",
    "Февраль",
    "Март",
    "Апрель",
    "Май",
    "Июнь",
    "Июль",
    "Август",
    "Сентябрь",
    "Октябрь",
    "Ноябрь",
    "Декабрь",
];

/// "Месяц Год" label for a calendar month, e.g. `Март 2024`.
pub fn month_label(year: i32, month: u32) -> Option<String> {
    let index = month.checked_sub(1)? as usize;
    let name = MONTHS_RU.get(index)?;
    Some(format!("{name} {year}"))
}

pub fn current_month_label() -> String {
    let now = Local::now();
    month_label(now.year(), now.month()).unwrap_or_default()
}

/// Month label for a sheet cell holding a date. The date is the first
/// whitespace-separated token in `YYYY-MM-DD` form; anything else yields
/// `None` so malformed rows are skipped rather than failing an aggregation.
pub fn cell_month_label(cell: &str) -> Option<String> {
    let token = cell.split_whitespace().next()?;
    let date = NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()?;
    month_label(date.year(), date.month())
}

/// Server-assigned submission timestamp, `YYYY-MM-DD HH:MM:SS` local time.
pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_label_uses_fixed_table() {
        assert_eq!(month_label(2024, 3).as_deref(), Some("Март 2024"));
        assert_eq!(month_label(2026, 12).as_deref(), Some("Декабрь 2026"));
        assert_eq!(month_label(2024, 0), None);
        assert_eq!(month_label(2024, 13), None);
    }

    #[test]
    fn cell_month_label_takes_first_token() {
        assert_eq!(
            cell_month_label("2024-03-15 10:30:00").as_deref(),
            Some("Март 2024")
        );
        assert_eq!(cell_month_label("2024-03-15").as_deref(), Some("Март 2024"));
    }

    #[test]
    fn cell_month_label_skips_malformed_dates() {
        assert_eq!(cell_month_label(""), None);
        assert_eq!(cell_month_label("yesterday"), None);
        assert_eq!(cell_month_label("15.03.2024"), None);
        assert_eq!(cell_month_label("2024-13-01"), None);
    }

    #[test]
    fn now_timestamp_has_sheet_format() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), 19);
        assert!(cell_month_label(&ts).is_some());
    }
}
