//! Line reading for the interactive console.

use std::io::{self, BufRead, Write};

pub const PROMPT: &str = "> ";
pub const CONTINUATION: &str = ". ";

/// Whether `source` has no unclosed brackets, braces or quotes and does not
/// end in a line continuation. Nothing inside braces but braces is counted.
pub fn is_complete(source: &str) -> bool {
    let mut braces: i64 = 0;
    let mut brackets: i64 = 0;
    let mut quote: Option<char> = None;
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                None => return false,
                Some('\n') if chars.as_str().is_empty() => return false,
                Some(_) => continue,
            }
        }
        if braces > 0 {
            match c {
                '{' => braces += 1,
                '}' => braces -= 1,
                _ => {}
            }
            continue;
        }
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => braces += 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            _ => {}
        }
    }
    braces <= 0 && brackets <= 0 && quote.is_none()
}

/// Read one submission, spanning lines while it is incomplete.
/// Returns `None` at end of input.
pub fn read_submission<I: BufRead, O: Write>(input: &mut I, out: &mut O) -> io::Result<Option<String>> {
    let mut buffer = String::new();
    loop {
        write!(out, "{}", if buffer.is_empty() { PROMPT } else { CONTINUATION })?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(if buffer.is_empty() { None } else { Some(buffer) });
        }
        buffer.push_str(&line);
        if is_complete(&buffer) {
            let trimmed = buffer.trim_end_matches(['\n', '\r']).to_string();
            return Ok(Some(trimmed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_is_complete() {
        assert!(is_complete("set a 1"));
        assert!(is_complete(""));
        assert!(!is_complete("proc f {x} {"));
        assert!(!is_complete("set a [list 1"));
        assert!(is_complete("set a {a [b}"));
        assert!(is_complete(r"set a \{"));
        assert!(!is_complete("set a \"open"));
        assert!(!is_complete("set a \\\n"));
    }

    #[test]
    fn test_read_multiline_submission() {
        let mut input = Cursor::new("proc f {x} {\n  + $x 1\n}\nf 2\n");
        let mut out = Vec::new();
        let first = read_submission(&mut input, &mut out).unwrap();
        assert_eq!(first.as_deref(), Some("proc f {x} {\n  + $x 1\n}"));
        let second = read_submission(&mut input, &mut out).unwrap();
        assert_eq!(second.as_deref(), Some("f 2"));
        assert_eq!(read_submission(&mut input, &mut out).unwrap(), None);
        assert_eq!(String::from_utf8(out).unwrap(), "> . . > > ");
    }

    #[test]
    fn test_empty_line_is_a_submission() {
        let mut input = Cursor::new("\n");
        let mut out = Vec::new();
        assert_eq!(read_submission(&mut input, &mut out).unwrap().as_deref(), Some(""));
    }
}
