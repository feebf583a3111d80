use std::fmt;

use serde::Serialize;

/// Client storage key holding the preferred language
pub const STORAGE_KEY: &str = "moueene_lang";

/// Text direction of a locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

/// Supported interface languages. English is the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Fr,
    Ar,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::En, Locale::Fr, Locale::Ar];

    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
            Locale::Ar => "ar",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Locale::En),
            "fr" => Some(Locale::Fr),
            "ar" => Some(Locale::Ar),
            _ => None,
        }
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Fr => "Français",
            Locale::Ar => "العربية",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Locale::Ar => Direction::Rtl,
            _ => Direction::Ltr,
        }
    }

    /// Whether casing rules of the source token carry over to translations
    pub fn is_latin(&self) -> bool {
        !matches!(self, Locale::Ar)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Pick the starting language: stored preference, then the document `lang`
/// attribute, then English. Unsupported values are skipped.
pub fn initial_language(stored: Option<&str>, document_lang: Option<&str>) -> Locale {
    stored
        .and_then(Locale::from_code)
        .or_else(|| document_lang.and_then(Locale::from_code))
        .unwrap_or(Locale::En)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for locale in Locale::ALL {
            assert_eq!(Locale::from_code(locale.code()), Some(locale));
        }
        assert_eq!(Locale::from_code(" FR "), Some(Locale::Fr));
        assert_eq!(Locale::from_code("de"), None);
    }

    #[test]
    fn only_arabic_is_rtl() {
        assert_eq!(Locale::Ar.direction(), Direction::Rtl);
        assert_eq!(Locale::Fr.direction(), Direction::Ltr);
        assert!(!Locale::Ar.is_latin());
    }

    #[test]
    fn initial_language_precedence() {
        assert_eq!(initial_language(Some("ar"), Some("fr")), Locale::Ar);
        assert_eq!(initial_language(Some("de"), Some("fr")), Locale::Fr);
        assert_eq!(initial_language(None, Some("es")), Locale::En);
        assert_eq!(initial_language(None, None), Locale::En);
    }
}
