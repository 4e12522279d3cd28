//! Place-name normalization.
//!
//! Every label that takes part in entity resolution goes through [`normalize`]
//! first. The output only ever contains `[a-z0-9]` runs joined by a single
//! separator, which makes the function idempotent: feeding a key back in
//! returns it unchanged.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Separator convention of a normalized key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    /// `den haag`: used when matching against rent tables.
    Spaced,
    /// `den_haag`: used for identifiers and population/housing joins.
    Identifier,
}

impl KeyStyle {
    fn separator(self) -> char {
        match self {
            KeyStyle::Spaced => ' ',
            KeyStyle::Identifier => '_',
        }
    }
}

static PARENTHETICAL: OnceLock<Regex> = OnceLock::new();

fn parenthetical() -> &'static Regex {
    PARENTHETICAL.get_or_init(|| Regex::new(r"\([^)]*\)").expect("static pattern compiles"))
}

/// Letters that canonical decomposition leaves untouched but which have a
/// conventional ASCII spelling.
fn transliterate(ch: char) -> Option<&'static str> {
    let replacement = match ch {
        'ø' => "o",
        'å' => "a",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        'đ' | 'ð' => "d",
        'ł' => "l",
        'ı' => "i",
        'þ' => "th",
        'ħ' => "h",
        'ŧ' => "t",
        _ => return None,
    };
    Some(replacement)
}

fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '/' | ',' | '_' | '-' | '.')
}

/// Normalizes a raw label. Absent input yields the empty key, which callers
/// must treat as "no data" and never match.
pub fn normalize(raw: Option<&str>, style: KeyStyle) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let separator = style.separator();
    let lowered = raw.to_lowercase();
    let without_notes = parenthetical().replace_all(&lowered, " ");

    let mut transliterated = String::with_capacity(without_notes.len());
    for ch in without_notes.chars() {
        match transliterate(ch) {
            Some(ascii) => transliterated.push_str(ascii),
            None => transliterated.push(ch),
        }
    }

    let mut key = String::with_capacity(transliterated.len());
    let mut pending_separator = false;
    let push_word = |key: &mut String, word: &str, pending: &mut bool| {
        if *pending && !key.is_empty() {
            key.push(separator);
        }
        *pending = false;
        key.push_str(word);
    };

    for ch in transliterated.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        let ch = ch.to_ascii_lowercase();
        match ch {
            'a'..='z' | '0'..='9' => {
                let mut buf = [0u8; 4];
                push_word(&mut key, ch.encode_utf8(&mut buf), &mut pending_separator);
            }
            '&' => {
                pending_separator = true;
                push_word(&mut key, "and", &mut pending_separator);
                pending_separator = true;
            }
            c if is_separator(c) => pending_separator = true,
            _ => {}
        }
    }
    key
}

pub fn spaced_key(raw: &str) -> String {
    normalize(Some(raw), KeyStyle::Spaced)
}

pub fn identifier_key(raw: &str) -> String {
    normalize(Some(raw), KeyStyle::Identifier)
}

/// Converts an already-normalized key between styles without re-folding it.
pub fn restyle(key: &str, style: KeyStyle) -> String {
    let target = style.separator();
    key.chars()
        .map(|c| if c == ' ' || c == '_' { target } else { c })
        .collect()
}
