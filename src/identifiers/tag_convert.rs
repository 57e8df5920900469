//! Conversion of language codes to comparable BCP47 primary subtags.
//!
//! Backends disagree on code formats: whatlang reports ISO 639-3 (`eng`),
//! fasttext reports `__label__en` or `__label__eng_Latn` depending on the model,
//! and configurations usually declare ISO 639-1 (`en`) or full tags (`en-US`).
//! Everything is brought down to a lowercase primary subtag, in ISO 639-1 when possible.
use std::collections::HashMap;

use lazy_static::lazy_static;
use oxilangtag::LanguageTag;

lazy_static! {
    /// ISO 639-3 (and some 639-2/B) codes to ISO 639-1.
    pub static ref TAG_REPLACE: HashMap<&'static str, &'static str> = [
        ("afr", "af"),
        ("aka", "ak"),
        ("amh", "am"),
        ("ara", "ar"),
        ("aze", "az"),
        ("azj", "az"),
        ("bel", "be"),
        ("ben", "bn"),
        ("bos", "bs"),
        ("bul", "bg"),
        ("cat", "ca"),
        ("ces", "cs"),
        ("cmn", "zh"),
        ("zho", "zh"),
        ("cym", "cy"),
        ("dan", "da"),
        ("deu", "de"),
        ("ell", "el"),
        ("eng", "en"),
        ("epo", "eo"),
        ("est", "et"),
        ("eus", "eu"),
        ("fas", "fa"),
        ("pes", "fa"),
        ("fin", "fi"),
        ("fra", "fr"),
        ("gle", "ga"),
        ("glg", "gl"),
        ("guj", "gu"),
        ("heb", "he"),
        ("hin", "hi"),
        ("hrv", "hr"),
        ("hun", "hu"),
        ("hye", "hy"),
        ("ind", "id"),
        ("isl", "is"),
        ("ita", "it"),
        ("jav", "jv"),
        ("jpn", "ja"),
        ("kan", "kn"),
        ("kat", "ka"),
        ("kaz", "kk"),
        ("khm", "km"),
        ("kor", "ko"),
        ("lat", "la"),
        ("lav", "lv"),
        ("lit", "lt"),
        ("mal", "ml"),
        ("mar", "mr"),
        ("mkd", "mk"),
        ("mlt", "mt"),
        ("mya", "my"),
        ("nep", "ne"),
        ("npi", "ne"),
        ("nld", "nl"),
        ("nob", "nb"),
        ("nno", "nn"),
        ("ori", "or"),
        ("ory", "or"),
        ("pan", "pa"),
        ("pol", "pl"),
        ("por", "pt"),
        ("ron", "ro"),
        ("rus", "ru"),
        ("sin", "si"),
        ("slk", "sk"),
        ("slv", "sl"),
        ("sna", "sn"),
        ("spa", "es"),
        ("sqi", "sq"),
        ("srp", "sr"),
        ("swe", "sv"),
        ("swh", "sw"),
        ("tam", "ta"),
        ("tel", "te"),
        ("tgl", "tl"),
        ("tha", "th"),
        ("tuk", "tk"),
        ("tur", "tr"),
        ("ukr", "uk"),
        ("urd", "ur"),
        ("uzb", "uz"),
        ("uzn", "uz"),
        ("vie", "vi"),
        ("yid", "yi"),
        ("zul", "zu"),
    ]
    .into_iter()
    .collect();
}

/// Normalize a language code into a lowercase primary subtag.
///
/// Fasttext `__label__` prefixes are stripped, `_` separators are accepted,
/// and ISO 639-3 codes are converted to ISO 639-1 when a mapping exists.
/// Unparseable codes are returned lowercased as-is.
pub fn normalize(code: &str) -> String {
    let code = code.strip_prefix("__label__").unwrap_or(code);
    let code = code.replace('_', "-");
    let primary = match LanguageTag::parse(code.clone()) {
        Ok(tag) => tag.primary_language().to_lowercase(),
        Err(_) => code.to_lowercase(),
    };
    match TAG_REPLACE.get(primary.as_str()) {
        Some(short) => short.to_string(),
        None => primary,
    }
}

/// Are both codes the same language?
pub fn same_language(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}
