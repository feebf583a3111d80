//! Embedded dictionaries and string translation

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::locale::Locale;

const FR_JSON: &str = include_str!("../dictionaries/fr.json");
const AR_JSON: &str = include_str!("../dictionaries/ar.json");

#[derive(Error, Debug)]
pub enum I18nError {
    #[error("Invalid {locale} dictionary: {source}")]
    Dictionary {
        locale: Locale,
        #[source]
        source: serde_json::Error,
    },
}

/// Phrase and word translations for one target locale
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dictionary {
    /// Exact English phrase to translation
    #[serde(default)]
    pub phrases: BTreeMap<String, String>,
    /// Lowercase English word to translation
    #[serde(default)]
    pub words: BTreeMap<String, String>,
}

impl Dictionary {
    pub fn from_json(locale: Locale, json: &str) -> Result<Self, I18nError> {
        serde_json::from_str(json).map_err(|source| I18nError::Dictionary { locale, source })
    }

    fn phrase(&self, key: &str) -> Option<&str> {
        self.phrases
            .get(key)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    fn word(&self, key: &str) -> Option<&str> {
        self.words
            .get(key)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }
}

/// Dictionaries for every non-source locale
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    fr: Dictionary,
    ar: Dictionary,
}

impl Catalog {
    /// Load the dictionaries compiled into the crate
    pub fn embedded() -> Result<Self, I18nError> {
        let catalog = Self {
            fr: Dictionary::from_json(Locale::Fr, FR_JSON)?,
            ar: Dictionary::from_json(Locale::Ar, AR_JSON)?,
        };
        debug!(
            fr_phrases = catalog.fr.phrases.len(),
            ar_phrases = catalog.ar.phrases.len(),
            "Loaded translation dictionaries"
        );
        Ok(catalog)
    }

    pub fn with_dictionaries(fr: Dictionary, ar: Dictionary) -> Self {
        Self { fr, ar }
    }

    /// Dictionary for a locale; English has none
    pub fn dictionary(&self, locale: Locale) -> Option<&Dictionary> {
        match locale {
            Locale::En => None,
            Locale::Fr => Some(&self.fr),
            Locale::Ar => Some(&self.ar),
        }
    }

    /// Translate a string, preserving its outer whitespace
    pub fn translate_string(&self, text: &str, locale: Locale) -> String {
        let core = text.trim();
        if core.is_empty() {
            return text.to_string();
        }

        let start = text.len() - text.trim_start().len();
        let end = text.trim_end().len();
        let translated = self.translate_core(core, locale);

        let mut out = String::with_capacity(text.len() + translated.len());
        out.push_str(&text[..start]);
        out.push_str(&translated);
        out.push_str(&text[end..]);
        out
    }

    fn translate_core(&self, core: &str, locale: Locale) -> String {
        let Some(dict) = self.dictionary(locale) else {
            return core.to_string();
        };

        if let Some(exact) = dict.phrase(core) {
            return exact.to_string();
        }

        let normalized = collapse_whitespace(core);
        if let Some(found) = dict.phrase(&normalized) {
            return found.to_string();
        }

        token_regex()
            .find_iter(core)
            .map(|m| {
                let token = m.as_str();
                match dict.phrase(token) {
                    Some(phrase) => phrase.to_string(),
                    None => translate_token(dict, token, locale),
                }
            })
            .collect()
    }
}

fn token_regex() -> &'static Regex {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"[\p{L}]+(?:'[\p{L}]+)?|[\p{N}]+|[^\p{L}\p{N}]+")
            .expect("Failed to compile token regex")
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn translate_token(dict: &Dictionary, token: &str, locale: Locale) -> String {
    if !token.chars().any(char::is_alphabetic) {
        return token.to_string();
    }

    match dict.word(&token.to_lowercase()) {
        Some(word) if locale.is_latin() => apply_latin_casing(token, word),
        Some(word) => word.to_string(),
        None => token.to_string(),
    }
}

fn is_all_caps(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_alphabetic()) && word == word.to_uppercase()
}

fn is_capitalized(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(first), Some(second)) if first.is_ascii_uppercase() && second.is_ascii_lowercase()
    )
}

fn apply_latin_casing(source: &str, translated: &str) -> String {
    if is_all_caps(source) {
        return translated.to_uppercase();
    }
    if is_capitalized(source) {
        let mut chars = translated.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    translated.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let fr = Dictionary {
            phrases: [("Book Now", "Réserver"), ("Home", "Accueil")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            words: [("booking", "réservation"), ("new", "nouveau"), ("my", "mon")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let ar = Dictionary {
            phrases: BTreeMap::new(),
            words: [("booking", "حجز")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        Catalog::with_dictionaries(fr, ar)
    }

    #[test]
    fn embedded_dictionaries_parse() {
        let catalog = Catalog::embedded().expect("embedded dictionaries");
        assert_eq!(catalog.translate_string("Book Now", Locale::Fr), "Réserver");
        assert_eq!(catalog.translate_string("Book Now", Locale::Ar), "احجز الآن");
        assert!(catalog.dictionary(Locale::En).is_none());
    }

    #[test]
    fn english_is_identity() {
        assert_eq!(catalog().translate_string(" Book Now ", Locale::En), " Book Now ");
    }

    #[test]
    fn outer_whitespace_is_preserved() {
        assert_eq!(
            catalog().translate_string("\n   Book Now  ", Locale::Fr),
            "\n   Réserver  "
        );
        assert_eq!(catalog().translate_string("   ", Locale::Fr), "   ");
    }

    #[test]
    fn internal_whitespace_is_collapsed_for_phrase_match() {
        assert_eq!(catalog().translate_string("Book\n    Now", Locale::Fr), "Réserver");
    }

    #[test]
    fn falls_back_to_words_with_casing() {
        let c = catalog();
        assert_eq!(c.translate_string("my booking", Locale::Fr), "mon réservation");
        assert_eq!(c.translate_string("My Booking", Locale::Fr), "Mon Réservation");
        assert_eq!(c.translate_string("NEW booking!", Locale::Fr), "NOUVEAU réservation!");
    }

    #[test]
    fn unknown_tokens_and_numbers_are_kept() {
        assert_eq!(
            catalog().translate_string("booking 42 zzz", Locale::Fr),
            "réservation 42 zzz"
        );
    }

    #[test]
    fn arabic_ignores_source_casing() {
        assert_eq!(catalog().translate_string("BOOKING", Locale::Ar), "حجز");
    }

    #[test]
    fn tokens_can_hit_phrases() {
        assert_eq!(catalog().translate_string("Home / booking", Locale::Fr), "Accueil / réservation");
    }
}
