use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// The speech service expects ISO 639-1 codes; users may configure either
/// 639-1 (2-letter) or 639-2 (3-letter) codes.
/// Language code type
#[derive(Debug, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if Language::from_639_1(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part1);
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2T);
        }
        if bibliographic_to_terminology(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2B);
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format, which is what
/// the speech service accepts in its `tl` parameter
pub fn normalize_to_part1(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    let part2t = match validate_language_code(&normalized_code)? {
        LanguageCodeType::Part1 => return Ok(normalized_code),
        LanguageCodeType::Part2T => normalized_code.as_str(),
        LanguageCodeType::Part2B => {
            bibliographic_to_terminology(&normalized_code).unwrap_or(&normalized_code)
        }
    };

    Language::from_639_3(part2t)
        .and_then(|l| l.to_639_1())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No ISO 639-1 equivalent for language code: {}", code))
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let part1 = normalize_to_part1(code)?;
    let lang = Language::from_639_1(&part1)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", part1))?;

    Ok(lang.to_name().to_string())
}
