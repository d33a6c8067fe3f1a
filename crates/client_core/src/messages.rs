//! User-visible strings, selectable per locale.

use std::str::FromStr;

use crate::error::UnknownLocale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Ru,
    En,
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ru" | "ru-ru" => Ok(Self::Ru),
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            other => Err(UnknownLocale(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    /// Count display text; `{count}` is substituted.
    pub count_template: String,
    pub view_link_text: String,
    pub missing_output_placeholder: String,
    pub request_failed: String,
    /// Column titles of the history table, in row order.
    pub history_headers: [String; 5],
}

impl Messages {
    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::Ru => Self {
                count_template: "Количество грузовиков: {count}".into(),
                view_link_text: "Просмотр".into(),
                missing_output_placeholder: "-".into(),
                request_failed: "Не удалось связаться с сервером".into(),
                history_headers: [
                    "ID".into(),
                    "Время".into(),
                    "Файл".into(),
                    "Грузовики".into(),
                    "Результат".into(),
                ],
            },
            Locale::En => Self {
                count_template: "Truck count: {count}".into(),
                view_link_text: "View".into(),
                missing_output_placeholder: "-".into(),
                request_failed: "Could not reach the server".into(),
                history_headers: [
                    "ID".into(),
                    "Time".into(),
                    "File".into(),
                    "Trucks".into(),
                    "Output".into(),
                ],
            },
        }
    }

    pub fn count_text(&self, count: i64) -> String {
        self.count_template.replace("{count}", &count.to_string())
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::for_locale(Locale::default())
    }
}
