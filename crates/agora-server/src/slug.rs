//! URL-safe slug generation for communities, channels, and categories.
//!
//! Example: "My Cool Community!" becomes "my-cool-community".

use crate::error::{AppError, Result};
use std::future::Future;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Terms that would otherwise slugify badly ("C#" -> "c"). Replaced
/// case-insensitively before any other processing.
const KNOWN_REPLACEMENTS: &[(&str, &str)] = &[
    ("C#", "csharp"),
    ("C++", "cplusplus"),
    ("F#", "fsharp"),
    (".NET", "dotnet"),
    ("Node.js", "nodejs"),
    ("Vue.js", "vuejs"),
    ("React.js", "reactjs"),
    ("Next.js", "nextjs"),
];

/// Generates a lowercase, hyphen-separated slug containing only ASCII
/// alphanumerics and hyphens.
///
/// Diacritics are folded to their ASCII base ("Café" -> "cafe"), runs of
/// other characters collapse to a single hyphen, and leading or trailing
/// hyphens are trimmed. A name with nothing usable in it is a validation
/// error.
pub fn generate(name: &str) -> Result<String> {
    let mut replaced = name.to_string();
    for (term, replacement) in KNOWN_REPLACEMENTS {
        replaced = replace_ignore_ascii_case(&replaced, term, replacement);
    }

    let folded = remove_diacritics(&replaced).to_lowercase();

    let mut slug = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        return Err(AppError::Validation(
            "Name produces an empty slug.".to_string(),
        ));
    }
    Ok(slug)
}

/// Generates a slug that `slug_exists` reports as free, appending `-2`,
/// `-3`, ... to the base slug until a free candidate is found.
pub async fn generate_unique<F, Fut>(name: &str, mut slug_exists: F) -> Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let base = generate(name)?;
    let mut candidate = base.clone();
    let mut counter = 2;

    while slug_exists(candidate.clone()).await? {
        candidate = format!("{base}-{counter}");
        counter += 1;
    }

    Ok(candidate)
}

/// NFD-decomposes, drops combining marks, and recomposes. The unicode
/// equivalent of "strip the accents".
fn remove_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Case-insensitive replace for ASCII needles. A byte window can only
/// match an ASCII needle if every byte in it is ASCII, so the spliced
/// ranges always fall on char boundaries.
fn replace_ignore_ascii_case(haystack: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }

    let mut result = String::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(pos) = rest
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
    {
        result.push_str(&rest[..pos]);
        result.push_str(replacement);
        rest = &rest[pos + needle.len()..];
    }
    result.push_str(rest);
    result
}
