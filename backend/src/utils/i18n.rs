use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Hi,
    /// Nagpuri
    Np,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "hi" => Ok(Locale::Hi),
            "np" => Ok(Locale::Np),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

pub type TranslationTable = HashMap<Locale, HashMap<&'static str, &'static str>>;

/// Looks `key` up for `locale`, returning the key itself when there is no entry.
pub fn translate(table: &TranslationTable, locale: Locale, key: &str) -> String {
    table
        .get(&locale)
        .and_then(|strings| strings.get(key))
        .map(|s| s.to_string())
        .unwrap_or_else(|| key.to_string())
}

/// A value with one variant per locale. Missing variants fall back to English.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Localized<T> {
    pub en: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hi: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub np: Option<T>,
}

impl<T> Localized<T> {
    pub fn new(en: T) -> Self {
        Self { en, hi: None, np: None }
    }

    pub fn with(mut self, locale: Locale, value: T) -> Self {
        match locale {
            Locale::En => self.en = value,
            Locale::Hi => self.hi = Some(value),
            Locale::Np => self.np = Some(value),
        }
        self
    }
}

pub fn localized<T>(entity: &Localized<T>, locale: Locale) -> &T {
    match locale {
        Locale::En => &entity.en,
        Locale::Hi => entity.hi.as_ref().unwrap_or(&entity.en),
        Locale::Np => entity.np.as_ref().unwrap_or(&entity.en),
    }
}

/// Strings used by the chat assistant.
pub fn chat_strings() -> TranslationTable {
    let mut table = TranslationTable::new();
    table.insert(
        Locale::En,
        HashMap::from([
            (
                "chat.welcome",
                "Hello! I'm the AgriVision AI assistant. I can help you with farming, crops, government schemes, and market information. Ask me anything!",
            ),
            ("chat.placeholder", "Type your question..."),
            ("chat.title", "AgriVision AI"),
            ("chat.subtitle", "Farmer Assistant"),
            ("chat.error", "Failed to send message. Please try again."),
        ]),
    );
    table.insert(
        Locale::Hi,
        HashMap::from([
            (
                "chat.welcome",
                "नमस्ते! मैं AgriVision AI सहायक हूं। मैं खेती, फसल, योजनाओं और बाजार के बारे में आपकी मदद कर सकता हूं। आप मुझसे कुछ भी पूछ सकते हैं!",
            ),
            ("chat.placeholder", "अपना सवाल लिखें..."),
            ("chat.subtitle", "किसान सहायक"),
        ]),
    );
    table.insert(
        Locale::Np,
        HashMap::from([
            (
                "chat.welcome",
                "नमस्ते! हमरे AgriVision AI सहायक हे। हम खेती, फसल, योजना अर बाजार के बारे में मदद कर सकत हन। हमसे कुछ भी पूछ सकत हो!",
            ),
            ("chat.placeholder", "अपन सवाल लिखो..."),
        ]),
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_falls_back_to_key() {
        let table = chat_strings();
        assert_eq!(translate(&table, Locale::Hi, "chat.nothing"), "chat.nothing");
        assert_eq!(translate(&table, Locale::Np, "chat.title"), "chat.title");
        assert_eq!(translate(&table, Locale::En, "chat.title"), "AgriVision AI");
    }

    #[test]
    fn localized_prefers_locale_then_english() {
        let crop = Localized::new("Paddy").with(Locale::Hi, "धान");
        assert_eq!(*localized(&crop, Locale::Hi), "धान");
        assert_eq!(*localized(&crop, Locale::Np), "Paddy");
    }

    #[test]
    fn locale_parses_codes() {
        assert_eq!("HI".parse::<Locale>().unwrap(), Locale::Hi);
        assert!("fr".parse::<Locale>().is_err());
    }
}
