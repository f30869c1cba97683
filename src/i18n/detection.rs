//! System locale detection utilities.

use std::env;

use crate::i18n::ids::LocaleId;

/// What: Detect system locale from environment variables.
///
/// Output:
/// - Locale such as `de-DE`, or `None` if nothing usable is set
///
/// Details:
/// - Checks `LC_ALL`, `LC_MESSAGES` and `LANG` in that order
/// - `C` and `POSIX` are treated as "no locale"
#[must_use]
pub fn detect_system_locale() -> Option<LocaleId> {
    ["LC_ALL", "LC_MESSAGES", "LANG"].into_iter().find_map(|var| {
        let value = env::var(var).ok()?;
        let parsed = parse_locale_string(&value)?;
        tracing::debug!(var, value = %value, locale = %parsed, "Detected system locale");
        Some(parsed)
    })
}

/// What: Normalize a POSIX locale string into a locale code.
///
/// Inputs:
/// - `locale_str`: e.g. `de_DE.UTF-8`, `en_US.utf8`, `sr_RS@latin`, `zh_Hans_CN`
///
/// Output:
/// - Code like `de-DE` or `zh-Hans-CN`, or `None` if unusable
///
/// Details:
/// - Drops the encoding (`.UTF-8`) and modifier (`@latin`)
/// - Language lowercase, 4-letter script title case, region uppercase
fn parse_locale_string(locale_str: &str) -> Option<LocaleId> {
    let trimmed = locale_str.trim();
    let base = trimmed.split(['.', '@']).next()?;
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }

    let mut parts = base.split(['_', '-']);
    let language = parts.next()?.to_lowercase();
    if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut code = language;
    for part in parts {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        code.push('-');
        if part.len() == 4 {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                code.push(first.to_ascii_uppercase());
                code.push_str(&chars.as_str().to_lowercase());
            }
        } else {
            code.push_str(&part.to_uppercase());
        }
    }
    LocaleId::new(code).ok()
}
