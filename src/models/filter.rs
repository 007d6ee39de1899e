// ============================================================================
// FILTRO DE FECHAS GLOBAL - Rangos rápidos compartidos por todas las páginas
// ============================================================================

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Rangos rápidos disponibles en el selector de fechas
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuickRange {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    Last30Days,
    Last60Days,
    Last90Days,
    ThisQuarter,
    LastQuarter,
    ThisYear,
    LastYear,
    AllTime,
}

impl QuickRange {
    pub fn slug(&self) -> &'static str {
        match self {
            QuickRange::Today => "today",
            QuickRange::Yesterday => "yesterday",
            QuickRange::ThisWeek => "this-week",
            QuickRange::LastWeek => "last-week",
            QuickRange::ThisMonth => "this-month",
            QuickRange::LastMonth => "last-month",
            QuickRange::Last30Days => "last-30-days",
            QuickRange::Last60Days => "last-60-days",
            QuickRange::Last90Days => "last-90-days",
            QuickRange::ThisQuarter => "this-quarter",
            QuickRange::LastQuarter => "last-quarter",
            QuickRange::ThisYear => "this-year",
            QuickRange::LastYear => "last-year",
            QuickRange::AllTime => "all-time",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickRange::Today => "Today",
            QuickRange::Yesterday => "Yesterday",
            QuickRange::ThisWeek => "This Week",
            QuickRange::LastWeek => "Last Week",
            QuickRange::ThisMonth => "This Month",
            QuickRange::LastMonth => "Last Month",
            QuickRange::Last30Days => "Last 30 Days",
            QuickRange::Last60Days => "Last 60 Days",
            QuickRange::Last90Days => "Last 90 Days",
            QuickRange::ThisQuarter => "This Quarter",
            QuickRange::LastQuarter => "Last Quarter",
            QuickRange::ThisYear => "This Year",
            QuickRange::LastYear => "Last Year",
            QuickRange::AllTime => "All Time",
        }
    }
}

/// Filtro activo, tal y como se persiste entre navegaciones
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DateFilter {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
}

/// Cotas listas para aplicar a una consulta: inicio inclusivo, fin exclusivo
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryRange {
    pub gte: Option<NaiveDate>,
    pub lt: Option<NaiveDate>,
}

impl Default for DateFilter {
    fn default() -> Self {
        Self::all_time()
    }
}

impl DateFilter {
    pub fn all_time() -> Self {
        Self {
            kind: QuickRange::AllTime.slug().to_string(),
            label: QuickRange::AllTime.label().to_string(),
            start_date: None,
            end_date: None,
        }
    }

    /// Construye el filtro de un rango rápido relativo a `today`
    pub fn quick(range: QuickRange, today: NaiveDate) -> Self {
        let (start, end) = quick_bounds(range, today);
        Self {
            kind: range.slug().to_string(),
            label: range.label().to_string(),
            start_date: start,
            end_date: end,
        }
    }

    pub fn custom(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            kind: "custom".to_string(),
            label: "Custom Range".to_string(),
            start_date: Some(start),
            end_date: Some(end),
        }
    }

    /// Cotas para la consulta al backend. El fin almacenado es inclusivo;
    /// aquí se convierte en exclusivo sumando un día
    pub fn query_range(&self) -> QueryRange {
        QueryRange {
            gte: self.start_date,
            lt: self.end_date.and_then(|end| end.checked_add_days(Days::new(1))),
        }
    }

    pub fn display_label(&self) -> String {
        if self.kind == "custom" {
            if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
                return format!(
                    "{} - {}",
                    start.format("%b %-d, %Y"),
                    end.format("%b %-d, %Y")
                );
            }
        }
        self.label.clone()
    }
}

fn days_back(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(date)
}

fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Primer y último día del trimestre `quarter` (0-based) de `year`
fn quarter_bounds(year: i32, quarter: u32) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let start = month_start(year, quarter * 3 + 1);
    let (next_year, next_month) = if quarter == 3 {
        (year + 1, 1)
    } else {
        (year, (quarter + 1) * 3 + 1)
    };
    let end = month_start(next_year, next_month).map(|d| days_back(d, 1));
    (start, end)
}

fn quick_bounds(range: QuickRange, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let year = today.year();
    let month = today.month();
    match range {
        QuickRange::Today => (Some(today), Some(today)),
        QuickRange::Yesterday => {
            let yesterday = days_back(today, 1);
            (Some(yesterday), Some(yesterday))
        }
        QuickRange::ThisWeek => {
            // Las semanas empiezan en domingo
            let start = days_back(today, u64::from(today.weekday().num_days_from_sunday()));
            (Some(start), Some(today))
        }
        QuickRange::LastWeek => {
            let start =
                days_back(today, u64::from(today.weekday().num_days_from_sunday()) + 7);
            let end = start.checked_add_days(Days::new(6));
            (Some(start), end)
        }
        QuickRange::ThisMonth => (month_start(year, month), Some(today)),
        QuickRange::LastMonth => {
            let (py, pm) = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
            let end = month_start(year, month).map(|d| days_back(d, 1));
            (month_start(py, pm), end)
        }
        QuickRange::Last30Days => (Some(days_back(today, 30)), Some(today)),
        QuickRange::Last60Days => (Some(days_back(today, 60)), Some(today)),
        QuickRange::Last90Days => (Some(days_back(today, 90)), Some(today)),
        QuickRange::ThisQuarter => {
            let quarter = (month - 1) / 3;
            (month_start(year, quarter * 3 + 1), Some(today))
        }
        QuickRange::LastQuarter => {
            let quarter = (month - 1) / 3;
            let (qy, q) = if quarter == 0 { (year - 1, 3) } else { (year, quarter - 1) };
            quarter_bounds(qy, q)
        }
        QuickRange::ThisYear => (month_start(year, 1), Some(today)),
        QuickRange::LastYear => (
            month_start(year - 1, 1),
            NaiveDate::from_ymd_opt(year - 1, 12, 31),
        ),
        QuickRange::AllTime => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // viernes
    const TODAY: (i32, u32, u32) = (2026, 8, 7);

    fn today() -> NaiveDate {
        date(TODAY.0, TODAY.1, TODAY.2)
    }

    #[test]
    fn this_week_starts_on_sunday() {
        let filter = DateFilter::quick(QuickRange::ThisWeek, today());
        assert_eq!(filter.start_date, Some(date(2026, 8, 2)));
        assert_eq!(filter.end_date, Some(today()));
    }

    #[test]
    fn last_week_covers_seven_days() {
        let filter = DateFilter::quick(QuickRange::LastWeek, today());
        assert_eq!(filter.start_date, Some(date(2026, 7, 26)));
        assert_eq!(filter.end_date, Some(date(2026, 8, 1)));
    }

    #[test]
    fn last_month_spans_whole_month() {
        let filter = DateFilter::quick(QuickRange::LastMonth, today());
        assert_eq!(filter.start_date, Some(date(2026, 7, 1)));
        assert_eq!(filter.end_date, Some(date(2026, 7, 31)));
    }

    #[test]
    fn last_month_wraps_year_boundary() {
        let filter = DateFilter::quick(QuickRange::LastMonth, date(2026, 1, 15));
        assert_eq!(filter.start_date, Some(date(2025, 12, 1)));
        assert_eq!(filter.end_date, Some(date(2025, 12, 31)));
    }

    #[test]
    fn quarters_resolve_including_year_wrap() {
        let filter = DateFilter::quick(QuickRange::ThisQuarter, today());
        assert_eq!(filter.start_date, Some(date(2026, 7, 1)));

        let filter = DateFilter::quick(QuickRange::LastQuarter, today());
        assert_eq!(filter.start_date, Some(date(2026, 4, 1)));
        assert_eq!(filter.end_date, Some(date(2026, 6, 30)));

        // En Q1 el trimestre anterior es el Q4 del año pasado
        let filter = DateFilter::quick(QuickRange::LastQuarter, date(2026, 2, 10));
        assert_eq!(filter.start_date, Some(date(2025, 10, 1)));
        assert_eq!(filter.end_date, Some(date(2025, 12, 31)));
    }

    #[test]
    fn all_time_has_no_bounds() {
        let filter = DateFilter::quick(QuickRange::AllTime, today());
        assert_eq!(filter.start_date, None);
        assert_eq!(filter.end_date, None);
        assert_eq!(filter.query_range(), QueryRange::default());
    }

    #[test]
    fn query_range_end_is_exclusive() {
        let filter = DateFilter::quick(QuickRange::Today, today());
        let range = filter.query_range();
        assert_eq!(range.gte, Some(today()));
        assert_eq!(range.lt, Some(date(2026, 8, 8)));
    }

    #[test]
    fn custom_filter_formats_display_label() {
        let filter = DateFilter::custom(date(2026, 1, 5), date(2026, 2, 1));
        assert_eq!(filter.display_label(), "Jan 5, 2026 - Feb 1, 2026");

        let preset = DateFilter::quick(QuickRange::Last30Days, today());
        assert_eq!(preset.display_label(), "Last 30 Days");
    }

    #[test]
    fn persists_with_original_field_names() {
        let filter = DateFilter::quick(QuickRange::Today, today());
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value["type"], "today");
        assert_eq!(value["label"], "Today");
        assert_eq!(value["startDate"], "2026-08-07");

        let all_time = DateFilter::all_time();
        let value = serde_json::to_value(&all_time).unwrap();
        assert!(value["startDate"].is_null());
    }
}
