//! Install language codes.

/// Language used when nothing else is known.
pub const DEFAULT_LOCALE: &str = "en_US";

/// Bring a user-typed language code into catalog form.
///
/// Five-character codes become `ll_CC` (`en_us` → `en_US`); three-character
/// codes are upper-cased (`all` → `ALL`). Anything else is returned unchanged.
pub fn normalize_locale(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    match chars.len() {
        5 => {
            let lang: String = chars[..2].iter().collect::<String>().to_lowercase();
            let region: String = chars[3..].iter().collect::<String>().to_uppercase();
            format!("{}{}{}", lang, chars[2], region)
        }
        3 => code.to_uppercase(),
        _ => code.to_string(),
    }
}

/// The operating system's language, from `LC_ALL`, `LC_MESSAGES` or `LANG`.
pub fn detect_os_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| locale_from_env(&value))
}

/// Extract `ll_CC` from a POSIX locale value such as `de_DE.UTF-8@euro`.
fn locale_from_env(value: &str) -> Option<String> {
    let code = value
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim();
    if code.is_empty() || code == "C" || code == "POSIX" {
        return None;
    }
    Some(normalize_locale(code))
}
