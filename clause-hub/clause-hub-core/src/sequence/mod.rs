//! Sort-key generation for clause sequence tokens and multi-level titles.


/// Rank given to an empty or missing token; sorts after every other band.
pub const EMPTY_RANK: i64 = 999_999;

const LETTER_BASE: i64 = 1000;
const ROMAN_BASE: i64 = 2000;
const FALLBACK_BASE: i64 = 900_000;
const FALLBACK_SPAN: i64 = 99_999;

/// Deterministic rank for a token no other band recognizes. The hash is
/// folded into [900000, 999998] so unknown tokens stay ahead of the empty
/// sentinel and clear of the numeric, letter, and Roman bands.
fn fallback_rank(token: &str) -> i64 {
    FALLBACK_BASE + i64::from(crc32fast::hash(token.as_bytes())) % FALLBACK_SPAN
}

/// Converts a clause sequence token into an integer rank for sibling
/// ordering.
///
/// Numeric tokens rank by value, a single letter ranks in the 1000 band
/// (`a` = 1000), a Roman numeral in the 2000 band, anything unrecognized in
/// the hashed fallback band, and an empty token last of all. A lone `i` or
/// `x` is taken as a letter, not a numeral; the letter band is checked first.
pub fn sequence_rank(token: &str) -> i64 {
    let token = token.trim();
    if token.is_empty() {
        return EMPTY_RANK;
    }
    if let Ok(value) = token.parse::<i64>() {
        return value;
    }
    let bytes = token.as_bytes();
    if bytes.len() == 1 && bytes[0].is_ascii_alphabetic() {
        return LETTER_BASE + i64::from(bytes[0].to_ascii_lowercase() - b'a');
    }
    if let Some(value) = roman_to_int(token) {
        return ROMAN_BASE + value;
    }
    fallback_rank(token)
}

/// Builds a lexicographic sort key from a full clause title.
///
/// The title is uppercased and split on `.`, `-`, and `_`; each part is
/// ranked by a positional type pattern that cycles ordinal, alpha, roman.
/// `10_C_II` keys as `[10, 2, 2]`, so multi-level titles order correctly
/// without any resolved hierarchy. Parts that miss their expected type fall
/// back to the hashed band. An empty title keys as `[EMPTY_RANK]`.
pub fn title_sort_key(title: &str) -> Vec<i64> {
    let title = title.trim();
    if title.is_empty() {
        return vec![EMPTY_RANK];
    }
    title
        .to_uppercase()
        .split(['.', '-', '_'])
        .enumerate()
        .map(|(position, part)| match position % 3 {
            0 => part
                .parse::<i64>()
                .unwrap_or_else(|_| fallback_rank(part)),
            1 => {
                let bytes = part.as_bytes();
                if bytes.len() == 1 && bytes[0].is_ascii_uppercase() {
                    i64::from(bytes[0] - b'A')
                } else {
                    fallback_rank(part)
                }
            }
            _ => roman_to_int(part).unwrap_or_else(|| fallback_rank(part)),
        })
        .collect()
}

fn symbol_value(symbol: &str) -> Option<i64> {
    Some(match symbol {
        "M" => 1000,
        "CM" => 900,
        "D" => 500,
        "CD" => 400,
        "C" => 100,
        "XC" => 90,
        "L" => 50,
        "XL" => 40,
        "X" => 10,
        "IX" => 9,
        "V" => 5,
        "IV" => 4,
        "I" => 1,
        _ => return None,
    })
}

/// Parses a Roman numeral, consuming subtractive pairs (`IV`, `IX`, `XL`,
/// `XC`, `CD`, `CM`) before single symbols. Case-insensitive. Permissive
/// about non-canonical forms (`IIII` parses as 4); any character outside the
/// numeral alphabet makes the whole token `None`.
pub fn roman_to_int(roman: &str) -> Option<i64> {
    let roman = roman.trim().to_ascii_uppercase();
    if roman.is_empty() || !roman.is_ascii() {
        return None;
    }
    let mut value = 0i64;
    let mut i = 0;
    while i < roman.len() {
        if i + 1 < roman.len() {
            if let Some(v) = symbol_value(&roman[i..i + 2]) {
                value += v;
                i += 2;
                continue;
            }
        }
        match symbol_value(&roman[i..i + 1]) {
            Some(v) => {
                value += v;
                i += 1;
            }
            None => return None,
        }
    }
    Some(value)
}

/// Composes the canonical Roman numeral for 1..=3999, `None` outside that
/// range.
pub fn int_to_roman(mut number: i64) -> Option<String> {
    if !(1..=3999).contains(&number) {
        return None;
    }
    const TABLE: [(&str, i64); 13] = [
        ("M", 1000),
        ("CM", 900),
        ("D", 500),
        ("CD", 400),
        ("C", 100),
        ("XC", 90),
        ("L", 50),
        ("XL", 40),
        ("X", 10),
        ("IX", 9),
        ("V", 5),
        ("IV", 4),
        ("I", 1),
    ];
    let mut result = String::new();
    for (symbol, value) in TABLE {
        while number >= value {
            result.push_str(symbol);
            number -= value;
        }
    }
    Some(result)
}
