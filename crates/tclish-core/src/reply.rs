/// Outcome of evaluating a sentence, a body or a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Normal completion with a value
    Ok(String),
    /// The sentence was a comment; sequences keep their previous value
    Comment,
    /// `return` was used; unwinds to the nearest frame boundary
    Return(String),
    /// Evaluation failed; the text already carries the stack trace
    Error(String),
}

impl Reply {
    pub fn ok(value: impl Into<String>) -> Self {
        Reply::Ok(value.into())
    }

    pub fn empty() -> Self {
        Reply::Ok(String::new())
    }

    /// `true` or the empty string
    pub fn boolean(value: bool) -> Self {
        if value {
            Reply::ok("true")
        } else {
            Reply::empty()
        }
    }

    /// Error without a stack trace
    pub fn error(message: impl std::fmt::Display, label: impl std::fmt::Display) -> Self {
        Reply::Error(format!("<{}> {}", label, message))
    }

    /// `Return` and `Error` stop the enclosing sequence
    pub fn is_abort(&self) -> bool {
        matches!(self, Reply::Return(_) | Reply::Error(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// The carried text; empty for comments
    pub fn value(&self) -> &str {
        match self {
            Reply::Ok(v) | Reply::Return(v) | Reply::Error(v) => v,
            Reply::Comment => "",
        }
    }

    pub fn into_value(self) -> String {
        match self {
            Reply::Ok(v) | Reply::Return(v) | Reply::Error(v) => v,
            Reply::Comment => String::new(),
        }
    }

    /// Split into the value or the error text
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Reply::Error(e) => Err(e),
            other => Ok(other.into_value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_flags() {
        assert!(Reply::Return("x".into()).is_abort());
        assert!(Reply::error("boom", "test").is_abort());
        assert!(!Reply::ok("x").is_abort());
        assert!(!Reply::Comment.is_abort());
    }

    #[test]
    fn test_error_format() {
        assert_eq!(Reply::error("boom", "cmd").value(), "<cmd> boom");
    }
}
