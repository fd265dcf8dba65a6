//! Splits source text into sentences of raw words.
//!
//! Words are kept verbatim (quotes and brackets included); substitution
//! happens later in the interpreter. Positions are char indices.

use tracing::warn;

/// Characters separating words
pub const WHITESPACE: [char; 6] = ['\t', '\n', '\u{0B}', '\u{0C}', '\r', ' '];

/// Characters that start or end a delimited word
pub const SPECIAL: [char; 6] = ['[', ']', '{', '}', '\'', '"'];

pub fn is_whitespace(c: char) -> bool {
    WHITESPACE.contains(&c)
}

pub fn is_special(c: char) -> bool {
    SPECIAL.contains(&c)
}

/// Failure while scanning, carrying the label reported in the trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub message: String,
    pub label: &'static str,
}

impl ScanError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            label: "unspecified",
        }
    }
}

/// Skip whitespace, reporting whether a newline was crossed
pub fn skip_whitespace(s: &[char], mut pos: usize) -> (usize, bool) {
    let mut newline = false;
    while pos < s.len() && is_whitespace(s[pos]) {
        newline = newline || s[pos] == '\n';
        pos += 1;
    }
    (pos, newline)
}

/// Number of chars taken by the escape sequence starting at `pos`,
/// backslash included
pub fn escape_len(s: &[char], pos: usize) -> usize {
    if s[pos] != '\\' || pos + 1 >= s.len() {
        return 1;
    }
    let max_digits = match s[pos + 1].to_ascii_lowercase() {
        'x' => 2,
        'u' => 4,
        _ => return 2,
    };
    let mut len = 2;
    while len - 2 < max_digits && pos + len < s.len() && s[pos + len].is_ascii_hexdigit() {
        len += 1;
    }
    len
}

/// Skip one word. Returns `pos` unchanged when it sits on a closing bracket.
/// The returned end may lie one past the input for unterminated strings.
pub fn skip_word(s: &[char], pos: usize) -> Result<usize, ScanError> {
    if pos >= s.len() {
        return Err(ScanError::new("skipping beyond the end of the string"));
    }
    match s[pos] {
        ']' | '}' => Ok(pos),
        '"' => skip_quoted(s, pos),
        '\'' => Ok(skip_single_quoted(s, pos)),
        '[' => skip_command(s, pos),
        '{' => Ok(skip_braced(s, pos)),
        _ => Ok(skip_bare(s, pos)),
    }
}

fn skip_bare(s: &[char], mut pos: usize) -> usize {
    while pos < s.len() && !is_whitespace(s[pos]) && !is_special(s[pos]) {
        pos += 1;
    }
    pos
}

fn skip_quoted(s: &[char], mut pos: usize) -> Result<usize, ScanError> {
    pos += 1;
    if pos >= s.len() {
        return Ok(pos);
    }
    if s[pos] == '"' {
        return Ok(pos + 1);
    }
    while pos < s.len() && s[pos] != '"' {
        match s[pos] {
            '\\' => pos += escape_len(s, pos),
            '[' => {
                let start = pos;
                pos = skip_command(s, pos)?;
                if pos == start {
                    return Err(ScanError::new("error progressing quoted string"));
                }
            }
            _ => pos += 1,
        }
    }
    Ok(pos + 1)
}

fn skip_single_quoted(s: &[char], mut pos: usize) -> usize {
    let mut escape = false;
    pos += 1;
    while pos < s.len() && (escape || s[pos] != '\'') {
        escape = s[pos] == '\\' && !escape;
        pos += 1;
    }
    pos + 1
}

/// Skip a balanced `[...]` command string
pub fn skip_command(s: &[char], mut pos: usize) -> Result<usize, ScanError> {
    if s.get(pos) != Some(&'[') {
        return Err(ScanError::new("invalid command string"));
    }
    pos += 1;
    while pos < s.len() && s[pos] != ']' {
        pos = skip_whitespace(s, pos).0;
        let start = pos;
        pos = skip_word(s, pos)?;
        if pos >= s.len() {
            return Err(ScanError::new(
                "<skip_command_string> skipping past end of string",
            ));
        }
        if s[pos] == '}' {
            warn!("Trailing curly bracket '{}'", context(s, pos));
            pos += 1;
        } else if pos == start && s[pos] != ']' {
            return Err(ScanError::new(format!(
                "error progressing skip_command '{}'",
                context(s, pos)
            )));
        }
    }
    Ok(pos + 1)
}

/// Skip a balanced `{...}` string; nothing inside is interpreted
pub fn skip_braced(s: &[char], mut pos: usize) -> usize {
    let mut depth = 1;
    while depth > 0 && pos + 1 < s.len() {
        pos += 1;
        match s[pos] {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }
    pos + 1
}

fn context(s: &[char], pos: usize) -> String {
    let start = pos.saturating_sub(3);
    let end = (pos + 3).min(s.len());
    s[start..end].iter().collect()
}

/// Read the words of one sentence starting at `pos`
pub fn read_sentence(s: &[char], pos: usize) -> Result<(usize, Vec<String>), ScanError> {
    let mut words = Vec::new();
    let (mut pos, mut newline) = skip_whitespace(s, pos);

    while !newline && pos < s.len() {
        let end = skip_word(s, pos)?.min(s.len());
        let word: String = s[pos..end].iter().collect();

        if word == ";" {
            pos = end;
            break;
        }
        if end == pos {
            return Err(ScanError {
                message: format!("trailing bracket '{}' near <{}>", s[pos], context(s, pos)),
                label: "read_sentence",
            });
        }

        let continuation = word == "\\";
        words.push(word);

        (pos, newline) = skip_whitespace(s, end);
        if continuation {
            newline = false;
            words.pop();
        }
    }

    Ok((pos, words))
}

/// Split a program into sentences, dropping comments
pub fn split_sentences(source: &str) -> Result<Vec<Vec<String>>, ScanError> {
    let chars: Vec<char> = source.chars().collect();
    let mut sentences = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let (next, words) = read_sentence(&chars, pos)?;
        pos = next;
        if words.first().is_some_and(|w| !w.starts_with('#')) {
            sentences.push(words);
        }
    }

    Ok(sentences)
}

/// Parameter names declared by a leading `args map ...` sentence
pub fn extract_header(body: &str) -> Option<Vec<String>> {
    let chars: Vec<char> = body.chars().collect();
    let (_, words) = read_sentence(&chars, 0).ok()?;
    if words.len() < 2 || words[0] != "args" || words[1] != "map" {
        return None;
    }
    Some(
        words[2..]
            .iter()
            .map(|w| match w.strip_prefix('\'').and_then(|w| w.strip_suffix('\'')) {
                Some(inner) => crate::text::unescape(inner),
                None => w.clone(),
            })
            .collect(),
    )
}
