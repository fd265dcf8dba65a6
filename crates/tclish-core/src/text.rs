//! String, list and number conventions shared by every command.
//!
//! Everything in tclish is a string: lists are packed strings, booleans are
//! `"true"` or `""`, numbers are parsed on demand.

use crate::scanner::{escape_len, is_special, is_whitespace, skip_whitespace, skip_word};
use std::cmp::Ordering;
use std::ops::Range;

/// Argument `index` or the empty string
pub fn nth(args: &[String], index: usize) -> &str {
    args.get(index).map(String::as_str).unwrap_or("")
}

/// The empty string is false, anything else is true
pub fn is_true(s: &str) -> bool {
    !s.is_empty()
}

/// A name that can be invoked as a command without quoting
pub fn is_command_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| is_whitespace(c) || is_special(c))
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if is_special(c) || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn unescape(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut pos = 0;

    while pos < chars.len() {
        if chars[pos] != '\\' {
            out.push(chars[pos]);
            pos += 1;
            continue;
        }
        let len = escape_len(&chars, pos);
        if len == 1 {
            out.push('\\');
            pos += 1;
            continue;
        }
        let code = chars[pos + 1];
        let digits: String = chars[pos + 2..pos + len].iter().collect();
        match code {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'r' => out.push('\r'),
            'x' | 'X' | 'u' | 'U' if !digits.is_empty() => {
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => out.extend(&chars[pos..pos + len]),
                }
            }
            other => out.push(other),
        }
        pos += len;
    }
    out
}

/// Pack strings into a list: `{'a''b c'}`
pub fn pack<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from("{");
    for item in items {
        out.push('\'');
        out.push_str(&escape(item.as_ref()));
        out.push('\'');
    }
    out.push('}');
    out
}

/// Unpack a list. Single-quoted elements are unescaped, anything else is
/// kept verbatim.
pub fn unpack(s: &str) -> Vec<String> {
    let mut chars: Vec<char> = s.chars().collect();
    if chars.len() >= 2 && chars[0] == '{' && chars[chars.len() - 1] == '}' {
        chars.pop();
        chars.remove(0);
    }

    let mut items = Vec::new();
    let mut pos = 0;
    loop {
        pos = skip_whitespace(&chars, pos).0;
        if pos >= chars.len() {
            break;
        }
        let end = match skip_word(&chars, pos) {
            Ok(end) => end.min(chars.len()).max(pos + 1),
            Err(_) => {
                items.push(chars[pos..].iter().collect());
                break;
            }
        };
        let word: String = chars[pos..end].iter().collect();
        let item = match word
            .strip_prefix('\'')
            .and_then(|w| w.strip_suffix('\''))
        {
            Some(inner) => unescape(inner),
            None => word,
        };
        items.push(item);
        pos = end;
    }
    items
}

/// Read a `$` variable name: `{any name}` or a run of alphanumerics, `_`, `-`
pub fn read_word(s: &[char], pos: usize) -> Option<(String, usize)> {
    if pos >= s.len() {
        return None;
    }
    if s[pos] == '{' {
        let mut end = pos + 1;
        while end < s.len() && !matches!(s[end], '\\' | '{' | '}') {
            end += 1;
        }
        if s.get(end) == Some(&'}') {
            return Some((s[pos + 1..end].iter().collect(), end + 1));
        }
        return None;
    }
    let mut end = pos;
    while end < s.len() && (s[end].is_alphanumeric() || s[end] == '_' || s[end] == '-') {
        end += 1;
    }
    if end == pos {
        return None;
    }
    Some((s[pos..end].iter().collect(), end))
}

/// A parsed numeric argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_integral(self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(f) => f.is_finite() && f.fract() == 0.0,
        }
    }

    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) if x.is_nan() => write!(f, "nan"),
            Number::Float(x) if x.is_infinite() => {
                write!(f, "{}", if x > 0.0 { "inf" } else { "-inf" })
            }
            Number::Float(x) if x.fract() == 0.0 => write!(f, "{:.0}", x + 0.0),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

fn strip_digit_separators(s: &str) -> Option<String> {
    if !s.contains('_') {
        return Some(s.to_string());
    }
    let chars: Vec<char> = s.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if *c == '_' {
            let before = i > 0 && chars[i - 1].is_ascii_digit();
            let after = chars.get(i + 1).is_some_and(|c| c.is_ascii_digit());
            if !before || !after {
                return None;
            }
        }
    }
    Some(s.replace('_', ""))
}

/// Parse an integer, falling back to a float
pub fn to_number(s: &str) -> Option<Number> {
    let cleaned = strip_digit_separators(s.trim())?;
    if let Ok(i) = cleaned.parse::<i64>() {
        return Some(Number::Int(i));
    }
    cleaned.parse::<f64>().ok().map(Number::Float)
}

/// Parse an integer, accepting integral floats
pub fn to_integer(s: &str) -> Option<i64> {
    match to_number(s)? {
        Number::Int(i) => Some(i),
        Number::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Some(f as i64)
        }
        Number::Float(_) => None,
    }
}

/// Python-style slice bounds over a sequence of `len` items
pub fn slice_range(len: usize, start: i64, stop: i64) -> Range<usize> {
    let clamp = |i: i64| -> usize {
        let i = if i < 0 { i + len as i64 } else { i };
        i.clamp(0, len as i64) as usize
    };
    let (start, stop) = (clamp(start), clamp(stop));
    if start >= stop {
        0..0
    } else {
        start..stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_specials() {
        assert_eq!(escape("a[b]{c}'d\"e\\"), "a\\[b\\]\\{c\\}\\'d\\\"e\\\\");
    }

    #[test]
    fn test_unescape_sequences() {
        assert_eq!(unescape(r"a\nb\tc"), "a\nb\tc");
        assert_eq!(unescape(r"\x41é"), "Aé");
        assert_eq!(unescape(r"\[\q"), "[q");
        assert_eq!(unescape("end\\"), "end\\");
    }

    #[test]
    fn test_pack_and_unpack() {
        let packed = pack(["a", "b c", "it's"]);
        assert_eq!(packed, "{'a''b c''it\\'s'}");
        assert_eq!(unpack(&packed), vec!["a", "b c", "it's"]);
    }

    #[test]
    fn test_unpack_bare_words() {
        assert_eq!(unpack("1 2 3"), vec!["1", "2", "3"]);
        assert_eq!(unpack(" a 1 b 2 "), vec!["a", "1", "b", "2"]);
        assert_eq!(unpack("{}"), Vec::<String>::new());
        assert_eq!(unpack("{''}"), vec![""]);
    }

    #[test]
    fn test_unpack_keeps_nested_braces() {
        assert_eq!(unpack("{a b} c"), vec!["{a b}", "c"]);
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number("42"), Some(Number::Int(42)));
        assert_eq!(to_number(" -7 "), Some(Number::Int(-7)));
        assert_eq!(to_number("1_000"), Some(Number::Int(1000)));
        assert_eq!(to_number("2.5"), Some(Number::Float(2.5)));
        assert_eq!(to_number("abc"), None);
        assert_eq!(to_number(""), None);
        assert_eq!(to_number("_1"), None);
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(to_integer("3"), Some(3));
        assert_eq!(to_integer("3.0"), Some(3));
        assert_eq!(to_integer("3.5"), None);
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Number::Float(2.0).to_string(), "2");
        assert_eq!(Number::Float(2.5).to_string(), "2.5");
        assert_eq!(Number::Float(f64::INFINITY).to_string(), "inf");
        assert_eq!(Number::Int(-3).to_string(), "-3");
    }

    #[test]
    fn test_read_word() {
        let s: Vec<char> = "name-1 rest".chars().collect();
        assert_eq!(read_word(&s, 0), Some(("name-1".to_string(), 6)));
        let s: Vec<char> = "{a b}c".chars().collect();
        assert_eq!(read_word(&s, 0), Some(("a b".to_string(), 5)));
        let s: Vec<char> = " x".chars().collect();
        assert_eq!(read_word(&s, 0), None);
    }

    #[test]
    fn test_slice_range() {
        assert_eq!(slice_range(5, 1, 3), 1..3);
        assert_eq!(slice_range(5, -2, 5), 3..5);
        assert_eq!(slice_range(5, 4, 2), 0..0);
        assert_eq!(slice_range(5, 0, 99), 0..5);
    }

    #[test]
    fn test_is_command_name() {
        assert!(is_command_name("lmap"));
        assert!(!is_command_name("a b"));
        assert!(!is_command_name("{x}"));
        assert!(!is_command_name(""));
    }

    #[test]
    fn test_slice_range_extreme_bounds() {
        assert_eq!(slice_range(3, i64::MIN, 3), 0..3);
        assert_eq!(slice_range(3, 0, i64::MIN), 0..0);
        assert_eq!(slice_range(3, i64::MAX, i64::MAX), 0..0);
    }

    mod list_properties {
        use super::*;
        use proptest::prelude::*;

        fn awkward_item() -> impl Strategy<Value = String> {
            "[a-z0-9 {}\\[\\]'\"\\\\\t\nxu]{0,12}"
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn prop_unpack_inverts_pack(items in prop::collection::vec(awkward_item(), 0..8)) {
                prop_assert_eq!(unpack(&pack(&items)), items);
            }

            #[test]
            fn prop_unpack_inverts_pack_any_text(items in prop::collection::vec(any::<String>(), 0..5)) {
                prop_assert_eq!(unpack(&pack(&items)), items);
            }

            #[test]
            fn prop_unescape_inverts_escape(s in any::<String>()) {
                prop_assert_eq!(unescape(&escape(&s)), s);
            }
        }
    }
}
