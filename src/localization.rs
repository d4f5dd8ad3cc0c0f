//! Locale model and the translation fallback chain.
//!
//! Content tables store one row per `(item, locale)`. Reads go through
//! [`LocalizationResolver`], which picks the requested locale, then the configured
//! default, then whatever row comes first. All functions here are pure and never fail:
//! a missing translation is `None`, not an error.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Locale
///
/// The fixed set of languages the portal publishes in. `Az` is the primary locale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
    TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Locale {
    #[default]
    Az,
    En,
    Ru,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Az, Locale::En, Locale::Ru];

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Az => "az",
            Locale::En => "en",
            Locale::Ru => "ru",
        }
    }

    /// Case-sensitive parse of a locale code. Unknown codes yield `None`.
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|locale| locale.as_str() == code)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LocaleTag
///
/// The locale carried by a stored row or a request. Values outside the known set are
/// kept verbatim in `Other` so legacy rows survive a round trip; they never equal a
/// known locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LocaleTag {
    Known(Locale),
    Other(String),
}

impl LocaleTag {
    pub fn known(&self) -> Option<Locale> {
        match self {
            LocaleTag::Known(locale) => Some(*locale),
            LocaleTag::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LocaleTag::Known(locale) => locale.as_str(),
            LocaleTag::Other(raw) => raw,
        }
    }
}

impl From<Locale> for LocaleTag {
    fn from(locale: Locale) -> Self {
        LocaleTag::Known(locale)
    }
}

impl From<&str> for LocaleTag {
    fn from(code: &str) -> Self {
        match Locale::parse(code) {
            Some(locale) => LocaleTag::Known(locale),
            None => LocaleTag::Other(code.to_string()),
        }
    }
}

impl From<String> for LocaleTag {
    fn from(code: String) -> Self {
        match Locale::parse(&code) {
            Some(locale) => LocaleTag::Known(locale),
            None => LocaleTag::Other(code),
        }
    }
}

impl From<LocaleTag> for String {
    fn from(tag: LocaleTag) -> Self {
        match tag {
            LocaleTag::Known(locale) => locale.as_str().to_string(),
            LocaleTag::Other(raw) => raw,
        }
    }
}

impl FromStr for LocaleTag {
    type Err = std::convert::Infallible;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Ok(LocaleTag::from(code))
    }
}

impl PartialEq<Locale> for LocaleTag {
    fn eq(&self, other: &Locale) -> bool {
        matches!(self, LocaleTag::Known(locale) if locale == other)
    }
}

impl fmt::Display for LocaleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that belongs to exactly one locale.
pub trait Localized {
    fn locale(&self) -> &LocaleTag;
}

/// resolve_with_fallback
///
/// Requested locale, then `fallback`, then the first row in input order.
/// With duplicate locales the first occurrence wins.
pub fn resolve_with_fallback<'a, T: Localized>(
    rows: &'a [T],
    requested: &LocaleTag,
    fallback: Locale,
) -> Option<&'a T> {
    if rows.is_empty() {
        return None;
    }

    if let Some(row) = rows.iter().find(|row| row.locale() == requested) {
        return Some(row);
    }

    if *requested != fallback {
        if let Some(row) = rows.iter().find(|row| *row.locale() == fallback) {
            return Some(row);
        }
    }

    rows.first()
}

/// One entry per known locale, `None` where no row covers it.
pub fn resolve_all<T: Localized>(rows: &[T]) -> BTreeMap<Locale, Option<&T>> {
    Locale::ALL
        .into_iter()
        .map(|locale| (locale, rows.iter().find(|row| *row.locale() == locale)))
        .collect()
}

pub fn has_locale<T: Localized>(rows: &[T], locale: &LocaleTag) -> bool {
    rows.iter().any(|row| row.locale() == locale)
}

/// Distinct locales in first-occurrence order, unknown tags included.
pub fn available_locales<T: Localized>(rows: &[T]) -> Vec<LocaleTag> {
    let mut seen: Vec<LocaleTag> = Vec::new();
    for row in rows {
        if !seen.contains(row.locale()) {
            seen.push(row.locale().clone());
        }
    }
    seen
}

/// LocalizationResolver
///
/// Binds the fallback chain to the configured default locale.
#[derive(Debug, Clone, Copy)]
pub struct LocalizationResolver {
    default_locale: Locale,
}

impl LocalizationResolver {
    pub fn new(default_locale: Locale) -> Self {
        Self { default_locale }
    }

    pub fn resolve<'a, T: Localized>(&self, rows: &'a [T], requested: &LocaleTag) -> Option<&'a T> {
        resolve_with_fallback(rows, requested, self.default_locale)
    }

    /// Parses the `lang` query value, falling back to the default locale when absent.
    pub fn requested(&self, lang: Option<&str>) -> LocaleTag {
        match lang.map(str::trim).filter(|code| !code.is_empty()) {
            Some(code) => LocaleTag::from(code),
            None => LocaleTag::Known(self.default_locale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Row {
        locale: LocaleTag,
        title: &'static str,
    }

    impl Localized for Row {
        fn locale(&self) -> &LocaleTag {
            &self.locale
        }
    }

    fn row(locale: impl Into<LocaleTag>, title: &'static str) -> Row {
        Row {
            locale: locale.into(),
            title,
        }
    }

    fn pair() -> Vec<Row> {
        vec![row(Locale::Az, "A"), row(Locale::En, "B")]
    }

    #[test]
    fn exact_match_wins() {
        let rows = pair();
        let resolver = LocalizationResolver::new(Locale::Az);
        let found = resolver.resolve(&rows, &Locale::En.into()).unwrap();
        assert_eq!(found.title, "B");
    }

    #[test]
    fn missing_locale_falls_back_to_default() {
        let rows = pair();
        let resolver = LocalizationResolver::new(Locale::Az);

        assert_eq!(resolver.resolve(&rows, &Locale::Ru.into()).unwrap().title, "A");
        assert_eq!(resolver.resolve(&rows, &"de".into()).unwrap().title, "A");
    }

    #[test]
    fn empty_rows_resolve_to_none() {
        let rows: Vec<Row> = Vec::new();
        let resolver = LocalizationResolver::new(Locale::Az);
        assert!(resolver.resolve(&rows, &Locale::Az.into()).is_none());
        assert!(resolver.resolve(&rows, &"zz".into()).is_none());
    }

    #[test]
    fn falls_back_to_first_row_when_default_is_missing() {
        let rows = vec![row(Locale::Ru, "R"), row(Locale::En, "E")];
        let resolver = LocalizationResolver::new(Locale::Az);
        assert_eq!(resolver.resolve(&rows, &"de".into()).unwrap().title, "R");
        // Requested equals the fallback and is absent: straight to the first row.
        assert_eq!(resolver.resolve(&rows, &Locale::Az.into()).unwrap().title, "R");
    }

    #[test]
    fn duplicate_locales_return_first_occurrence() {
        let rows = vec![
            row(Locale::En, "first"),
            row(Locale::En, "second"),
            row(Locale::Az, "az"),
        ];
        let found = resolve_with_fallback(&rows, &Locale::En.into(), Locale::Az).unwrap();
        assert_eq!(found.title, "first");
    }

    #[test]
    fn unknown_row_locale_never_matches_known_lookup() {
        let rows = vec![row("xx", "legacy"), row(Locale::En, "E")];

        assert!(!has_locale(&rows, &Locale::Az.into()));
        assert!(has_locale(&rows, &"xx".into()));
        // No az row: falls back past the unknown row only via "first available".
        let found = resolve_with_fallback(&rows, &Locale::Ru.into(), Locale::En).unwrap();
        assert_eq!(found.title, "E");
        let all = resolve_all(&rows);
        assert!(all.values().filter_map(|r| *r).all(|r| r.title == "E"));
    }

    #[test]
    fn resolve_all_has_one_entry_per_known_locale() {
        let rows = pair();
        let all = resolve_all(&rows);

        assert_eq!(all.len(), Locale::ALL.len());
        assert_eq!(all[&Locale::Az].map(|r| r.title), Some("A"));
        assert_eq!(all[&Locale::En].map(|r| r.title), Some("B"));
        assert!(all[&Locale::Ru].is_none());
    }

    #[test]
    fn available_locales_dedupes_in_first_occurrence_order() {
        let rows = vec![row(Locale::Az, "1"), row(Locale::En, "2"), row(Locale::Az, "3")];
        assert_eq!(
            available_locales(&rows),
            vec![LocaleTag::Known(Locale::Az), LocaleTag::Known(Locale::En)]
        );
    }

    #[test]
    fn requested_defaults_when_lang_is_blank() {
        let resolver = LocalizationResolver::new(Locale::En);
        assert_eq!(resolver.requested(None), LocaleTag::Known(Locale::En));
        assert_eq!(resolver.requested(Some("  ")), LocaleTag::Known(Locale::En));
        assert_eq!(resolver.requested(Some("ru")), LocaleTag::Known(Locale::Ru));
        assert_eq!(resolver.requested(Some("RU")), LocaleTag::Other("RU".into()));
    }

    #[test]
    fn locale_tag_serializes_as_plain_string() {
        let known = serde_json::to_string(&LocaleTag::Known(Locale::Ru)).unwrap();
        let other: LocaleTag = serde_json::from_str("\"tr\"").unwrap();
        assert_eq!(known, "\"ru\"");
        assert_eq!(other, LocaleTag::Other("tr".into()));
    }
}
