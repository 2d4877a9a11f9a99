//! Display strings for the tracking and profile screens.
//!
//! A [`Localization`] is a plain value handed to whatever renders text. There is no global
//! locale.

use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ru,
    Kk,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
            Locale::Kk => "kk",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported locale {0:?}")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ru" => Ok(Locale::Ru),
            "kk" => Ok(Locale::Kk),
            _ => Err(UnknownLocale(s.to_string())),
        }
    }
}

// key, en, ru, kk
const STRINGS: &[(&str, &str, &str, &str)] = &[
    ("tracking", "Tracking", "Отслеживание", "Бақылау"),
    ("elapsed_time", "Elapsed Time", "Прошедшее время", "Өткен уақыт"),
    ("distance", "Distance", "Дистанция", "Қашықтық"),
    ("heart_rate", "Heart Rate", "Пульс", "Жүрек соғуы"),
    ("calories", "Calories", "Калории", "Калориялар"),
    ("speed", "Speed", "Скорость", "Жылдамдық"),
    ("progress", "Progress", "Прогресс", "Прогресс"),
    ("finish_trip", "Finish Trip", "Завершить поход", "Саяхатты аяқтау"),
    ("pause", "Pause", "Пауза", "Кідірту"),
    ("resume", "Resume", "Продолжить", "Жалғастыру"),
    ("hike_completed", "Hike Completed!", "Поход завершен!", "Саяхат аяқталды!"),
    ("no_trips_yet", "No trips yet", "Пока нет походов", "Әлі саяхат жоқ"),
    ("recent_trips", "Recent Trips", "Недавние походы", "Соңғы саяхаттар"),
    ("hiking_statistics", "Hiking Statistics", "Статистика походов", "Саяхат статистикасы"),
    ("hikes", "Hikes", "Походы", "Саяхаттар"),
    ("duration", "Duration", "Длительность", "Ұзақтығы"),
    ("elevation_gain", "Elevation Gain", "Набор высоты", "Биіктік өсімі"),
    ("weather_conditions", "Weather Conditions", "Погодные условия", "Ауа райы жағдайлары"),
    ("start_time", "Start Time", "Время начала", "Басталу уақыты"),
    ("end_time", "End Time", "Время окончания", "Аяқталу уақыты"),
    ("current_speed", "Current Speed", "Текущая скорость", "Ағымдағы жылдамдық"),
    ("avg_speed", "Avg Speed", "Средняя скорость", "Орташа жылдамдық"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Localization {
    locale: Locale,
}

impl Localization {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Unknown keys come back unchanged.
    pub fn text<'a>(&self, key: &'a str) -> &'a str {
        let Some(&(_, en, ru, kk)) = STRINGS.iter().find(|(k, ..)| *k == key) else {
            return key;
        };
        match self.locale {
            Locale::En => en,
            Locale::Ru => ru,
            Locale::Kk => kk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_each_locale() {
        assert_eq!(Localization::new(Locale::En).text("finish_trip"), "Finish Trip");
        assert_eq!(Localization::new(Locale::Ru).text("finish_trip"), "Завершить поход");
        assert_eq!(Localization::new(Locale::Kk).text("finish_trip"), "Саяхатты аяқтау");
    }

    #[test]
    fn unknown_key_falls_back() {
        assert_eq!(Localization::new(Locale::Ru).text("summit_photo"), "summit_photo");
    }

    #[test]
    fn parses_locale_codes() {
        assert_eq!("RU".parse::<Locale>(), Ok(Locale::Ru));
        assert_eq!(" kk ".parse::<Locale>(), Ok(Locale::Kk));
        assert!("de".parse::<Locale>().is_err());
        assert_eq!(Locale::Kk.to_string(), "kk");
    }

    #[test]
    fn every_key_is_translated() {
        for (key, en, ru, kk) in STRINGS {
            assert!(!en.is_empty() && !ru.is_empty() && !kk.is_empty(), "{key}");
        }
    }
}
