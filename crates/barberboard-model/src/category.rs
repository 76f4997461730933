use crate::payload::{
    FieldVisit, MasterPlan, MorningEvent, NewbieAdaptation, OneOnOneMeeting, Review, WeeklyMetrics,
};
use crate::ValidationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Grid capacity for newly created category sheets.
pub const SHEET_ROWS: u32 = 1000;
pub const SHEET_COLS: u32 = 20;

pub const SUMMARY_SHEET_NAME: &str = "Сводка";
pub const SUMMARY_HEADERS: &[&str] = &[
    "Дата отправки",
    "Филиал",
    "Управляющий",
    "Месяц",
    "Метрика",
    "Текущее количество",
    "Цель на месяц",
    "Выполнение %",
];

/// A single spreadsheet cell as written through the values API. Numbers stay
/// numbers so the sheet can aggregate them; everything else is text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Display for CellValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{v}")
                }
            }
            CellValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    MorningEvents,
    FieldVisits,
    OneOnOne,
    WeeklyMetrics,
    MasterPlans,
    Reviews,
    NewbieAdaptation,
}

/// Per-category table driving the generic submit/list/summarize pipeline.
#[derive(Debug, Clone, Copy)]
pub struct CategorySchema {
    pub slug: &'static str,
    pub sheet_name: &'static str,
    /// JSON key in dashboard summaries.
    pub dashboard_key: &'static str,
    pub dashboard_label: &'static str,
    /// Metric name written into the branch summary sheet.
    pub summary_metric: &'static str,
    pub headers: &'static [&'static str],
    pub monthly_goal: u32,
    /// Whether the submit body is a JSON array of records.
    pub batch: bool,
}

const MORNING_EVENTS: CategorySchema = CategorySchema {
    slug: "morning-events",
    sheet_name: "Утренние мероприятия",
    dashboard_key: "morning_events",
    dashboard_label: "Утренние мероприятия",
    summary_metric: "Утренние мероприятия",
    headers: &[
        "Дата отправки",
        "Дата",
        "Неделя",
        "Тип мероприятия",
        "Участники",
        "Эффективность",
        "Комментарий",
    ],
    monthly_goal: 16,
    batch: true,
};

const FIELD_VISITS: CategorySchema = CategorySchema {
    slug: "field-visits",
    sheet_name: "Полевые выходы",
    dashboard_key: "field_visits",
    dashboard_label: "Полевые выходы",
    summary_metric: "Полевые выходы",
    headers: &[
        "Дата отправки",
        "Дата",
        "Имя мастера",
        "Качество стрижек",
        "Качество сервиса",
        "Комментарий доп. услуги",
        "Оценка доп. услуги",
        "Комментарий косметика",
        "Оценка косметика",
        "Комментарий стандарты",
        "Оценка стандарты",
        "Выявленные ошибки",
        "Общая оценка",
        "Дата следующей проверки",
    ],
    monthly_goal: 4,
    batch: true,
};

const ONE_ON_ONE: CategorySchema = CategorySchema {
    slug: "one-on-one",
    sheet_name: "One-on-One",
    dashboard_key: "one_on_one",
    dashboard_label: "One-on-One",
    summary_metric: "One-on-One встречи",
    headers: &[
        "Дата отправки",
        "Дата встречи",
        "Имя мастера",
        "Стояла цель",
        "Результаты работы",
        "План развития",
        "Показатель",
        "Дата следующей встречи",
    ],
    monthly_goal: 6,
    batch: true,
};

const WEEKLY_METRICS: CategorySchema = CategorySchema {
    slug: "weekly-metrics",
    sheet_name: "Еженедельные показатели",
    dashboard_key: "weekly_reports",
    dashboard_label: "Еженедельные отчёты",
    summary_metric: "Еженедельные отчёты",
    headers: &[
        "Дата отправки",
        "Период",
        "Средний чек (план)",
        "Средний чек (факт)",
        "Косметика (план)",
        "Косметика (факт)",
        "Доп. услуги (план)",
        "Доп. услуги (факт)",
        "Выполнение среднего чека %",
        "Выполнение косметики %",
        "Выполнение доп. услуг %",
    ],
    monthly_goal: 4,
    batch: false,
};

const MASTER_PLANS: CategorySchema = CategorySchema {
    slug: "master-plans",
    sheet_name: "Планы мастеров",
    dashboard_key: "master_plans",
    dashboard_label: "Планы мастеров",
    summary_metric: "Индивидуальные планы",
    headers: &[
        "Дата отправки",
        "Месяц",
        "Имя мастера",
        "Средний чек (план)",
        "Средний чек (факт)",
        "Доп. услуги кол-во (план)",
        "Доп. услуги кол-во (факт)",
        "Объем продаж (план)",
        "Объем продаж (факт)",
        "Зарплата (план)",
        "Зарплата (факт)",
        "Выполнение среднего чека %",
        "Выполнение доп. услуг %",
        "Выполнение продаж %",
        "Выполнение зарплаты %",
    ],
    monthly_goal: 10,
    batch: true,
};

const REVIEWS: CategorySchema = CategorySchema {
    slug: "reviews",
    sheet_name: "Отзывы",
    dashboard_key: "reviews",
    dashboard_label: "Отзывы",
    summary_metric: "Отзывы",
    headers: &[
        "Дата отправки",
        "Неделя",
        "Имя управляющего",
        "План отзывов",
        "Факт отзывов",
        "Целевой показатель за месяц",
        "Выполнение недели %",
    ],
    monthly_goal: 60,
    batch: false,
};

const NEWBIE_ADAPTATION: CategorySchema = CategorySchema {
    slug: "newbie-adaptation",
    sheet_name: "Адаптация новичков",
    dashboard_key: "new_employees",
    dashboard_label: "Новые сотрудники",
    summary_metric: "Новые сотрудники",
    headers: &[
        "Дата отправки",
        "Дата начала",
        "Имя новичка",
        "Практика стрижек",
        "Стандарты сервиса",
        "Гигиена и санитария",
        "Доп. услуги",
        "Продажа косметики",
        "Основы iClient",
        "Статус адаптации",
    ],
    monthly_goal: 10,
    batch: true,
};

impl Category {
    /// Branch summary rows are written in this order.
    pub const ALL: [Category; 7] = [
        Category::MorningEvents,
        Category::FieldVisits,
        Category::OneOnOne,
        Category::WeeklyMetrics,
        Category::MasterPlans,
        Category::Reviews,
        Category::NewbieAdaptation,
    ];

    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.schema().slug == slug)
    }

    #[must_use]
    pub fn schema(self) -> &'static CategorySchema {
        match self {
            Category::MorningEvents => &MORNING_EVENTS,
            Category::FieldVisits => &FIELD_VISITS,
            Category::OneOnOne => &ONE_ON_ONE,
            Category::WeeklyMetrics => &WEEKLY_METRICS,
            Category::MasterPlans => &MASTER_PLANS,
            Category::Reviews => &REVIEWS,
            Category::NewbieAdaptation => &NEWBIE_ADAPTATION,
        }
    }

    #[must_use]
    pub fn slug(self) -> &'static str {
        self.schema().slug
    }

    #[must_use]
    pub fn sheet_name(self) -> &'static str {
        self.schema().sheet_name
    }

    /// Parses a submit body into sheet rows, one per record. Batch
    /// categories take a bare JSON array; the rest take a single object.
    pub fn rows_from_submission(
        self,
        body: &Value,
        timestamp: &str,
    ) -> Result<Vec<Vec<CellValue>>, ValidationError> {
        let schema = self.schema();
        if schema.batch {
            let items = body.as_array().ok_or_else(|| {
                ValidationError(format!("{} submission must be a JSON array", schema.slug))
            })?;
            items
                .iter()
                .map(|item| self.row_from_record(item, timestamp))
                .collect()
        } else {
            if !body.is_object() {
                return Err(ValidationError(format!(
                    "{} submission must be a JSON object",
                    schema.slug
                )));
            }
            Ok(vec![self.row_from_record(body, timestamp)?])
        }
    }

    fn row_from_record(
        self,
        record: &Value,
        timestamp: &str,
    ) -> Result<Vec<CellValue>, ValidationError> {
        match self {
            Category::MorningEvents => {
                let event: MorningEvent = parse_record(record)?;
                event.validate()?;
                Ok(event.build_row(timestamp))
            }
            Category::FieldVisits => {
                let visit: FieldVisit = parse_record(record)?;
                visit.validate()?;
                Ok(visit.build_row(timestamp))
            }
            Category::OneOnOne => {
                let meeting: OneOnOneMeeting = parse_record(record)?;
                meeting.validate()?;
                Ok(meeting.build_row(timestamp))
            }
            Category::WeeklyMetrics => {
                let metrics: WeeklyMetrics = parse_record(record)?;
                metrics.validate()?;
                Ok(metrics.build_row(timestamp))
            }
            Category::MasterPlans => {
                let plan: MasterPlan = parse_record(record)?;
                plan.validate()?;
                Ok(plan.build_row(timestamp))
            }
            Category::Reviews => {
                let review: Review = parse_record(record)?;
                review.validate()?;
                Ok(review.build_row(timestamp))
            }
            Category::NewbieAdaptation => {
                let adaptation: NewbieAdaptation = parse_record(record)?;
                adaptation.validate()?;
                Ok(adaptation.build_row(timestamp))
            }
        }
    }
}

fn parse_record<T: DeserializeOwned>(record: &Value) -> Result<T, ValidationError> {
    serde_json::from_value(record.clone())
        .map_err(|e| ValidationError(format!("malformed record: {e}")))
}
