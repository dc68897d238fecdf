//! Per-language trigger phrase tables
//!
//! One table is selected from the locale tag at startup and stays fixed for
//! the lifetime of the daemon. Matching is case-sensitive, so tables list
//! every capitalization a recognizer is expected to produce.

use serde::{Deserialize, Serialize};

use super::motion::PrimitiveCommand;

/// Trigger phrases grouped by the command they activate
pub type TriggerTable = &'static [(PrimitiveCommand, &'static [&'static str])];

const JAPANESE: TriggerTable = &[
    (PrimitiveCommand::Forward, &["進", "行", "いけ", "スタート"]),
    (PrimitiveCommand::Back, &["後", "下"]),
    (PrimitiveCommand::Left, &["左"]),
    (PrimitiveCommand::Right, &["右"]),
    (PrimitiveCommand::Stop, &["止", "ストップ"]),
];

const CHINESE: TriggerTable = &[
    (PrimitiveCommand::Forward, &["前进"]),
    (PrimitiveCommand::Back, &["倒车"]),
    (PrimitiveCommand::Left, &["左转"]),
    (PrimitiveCommand::Right, &["右转"]),
    (PrimitiveCommand::Stop, &["停"]),
];

const ENGLISH: TriggerTable = &[
    (
        PrimitiveCommand::Forward,
        &["Forward", "forward", "Go", "go", "Start", "start"],
    ),
    (PrimitiveCommand::Back, &["Back", "back"]),
    (PrimitiveCommand::Left, &["Left", "left"]),
    (PrimitiveCommand::Right, &["Right", "right"]),
    (PrimitiveCommand::Stop, &["Stop", "stop", "Halt", "halt"]),
];

/// Languages with a dedicated trigger table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Default table, used for any unrecognized locale
    Japanese,
    Chinese,
    English,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Japanese => write!(f, "ja"),
            Language::Chinese => write!(f, "zh"),
            Language::English => write!(f, "en"),
        }
    }
}

/// The active set of trigger phrases
#[derive(Debug, Clone)]
pub struct Vocabulary {
    language: Language,
    recognizer_locale: String,
    table: TriggerTable,
}

impl Vocabulary {
    /// Select the table for a locale tag such as `en-US`, `zh_CN.UTF-8` or
    /// `ja`. Unknown or empty tags fall back to the Japanese table.
    pub fn for_locale(tag: &str) -> Self {
        match language_subtag(tag).as_str() {
            "zh" => Self {
                language: Language::Chinese,
                recognizer_locale: "zh-CN".to_string(),
                table: CHINESE,
            },
            "en" => Self {
                language: Language::English,
                recognizer_locale: english_locale(tag),
                table: ENGLISH,
            },
            _ => Self::default(),
        }
    }

    /// Vocabulary over an arbitrary table
    #[cfg(test)]
    pub fn from_table(table: TriggerTable) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    /// Trigger phrases for every primitive command
    pub fn lookup(&self) -> TriggerTable {
        self.table
    }

    /// Trigger phrases for a single command
    #[cfg(test)]
    pub fn triggers(&self, command: PrimitiveCommand) -> &'static [&'static str] {
        self.table
            .iter()
            .find(|(c, _)| *c == command)
            .map(|(_, phrases)| *phrases)
            .unwrap_or(&[])
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Locale the external recognizer should be configured with
    pub fn recognizer_locale(&self) -> &str {
        &self.recognizer_locale
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            language: Language::Japanese,
            recognizer_locale: "ja-JP".to_string(),
            table: JAPANESE,
        }
    }
}

/// Lowercased primary language subtag of a BCP-47 or POSIX locale tag
fn language_subtag(tag: &str) -> String {
    tag.split(['-', '_', '.', '@'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Normalize an English POSIX/BCP-47 tag to `en-XX`, defaulting to `en-US`
fn english_locale(tag: &str) -> String {
    let base = tag.split(['.', '@']).next().unwrap_or_default();
    let mut parts = base.split(['-', '_']).filter(|p| !p.is_empty());
    parts.next();

    match parts.next() {
        Some(region) if region.len() == 2 => format!("en-{}", region.to_ascii_uppercase()),
        _ => "en-US".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_japanese() {
        let vocab = Vocabulary::for_locale("");
        assert_eq!(vocab.language(), Language::Japanese);
        assert_eq!(vocab.recognizer_locale(), "ja-JP");
        assert_eq!(vocab.triggers(PrimitiveCommand::Left), &["左"]);
    }

    #[test]
    fn test_unknown_locale_falls_back() {
        let vocab = Vocabulary::for_locale("fr-FR");
        assert_eq!(vocab.language(), Language::Japanese);

        let vocab = Vocabulary::for_locale("C");
        assert_eq!(vocab.language(), Language::Japanese);
    }

    #[test]
    fn test_chinese_selection() {
        for tag in ["zh", "zh-CN", "zh_TW.UTF-8", "zh-Hans-CN"] {
            let vocab = Vocabulary::for_locale(tag);
            assert_eq!(vocab.language(), Language::Chinese, "tag {tag}");
            assert_eq!(vocab.recognizer_locale(), "zh-CN");
        }
        let vocab = Vocabulary::for_locale("zh-CN");
        assert_eq!(vocab.triggers(PrimitiveCommand::Back), &["倒车"]);
    }

    #[test]
    fn test_english_selection() {
        let vocab = Vocabulary::for_locale("en_GB.UTF-8");
        assert_eq!(vocab.language(), Language::English);
        assert_eq!(vocab.recognizer_locale(), "en-GB");
        assert!(vocab.triggers(PrimitiveCommand::Stop).contains(&"halt"));

        assert_eq!(Vocabulary::for_locale("EN").recognizer_locale(), "en-US");
        assert_eq!(Vocabulary::for_locale("en-us").recognizer_locale(), "en-US");
    }

    #[test]
    fn test_tables_cover_every_primitive() {
        for tag in ["ja", "zh", "en"] {
            let vocab = Vocabulary::for_locale(tag);
            assert_eq!(vocab.lookup().len(), 5);
            for (command, phrases) in vocab.lookup() {
                assert!(!phrases.is_empty(), "{tag}: {command} has no triggers");
            }
        }
    }
}
