use std::io::Write;
use std::sync::Mutex;

/// Destination for `print` and `puts`
pub trait OutputSink: Send + Sync {
    fn write(&self, text: &str);
}

/// Sink that writes straight to stdout
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Collecting sink for testing
/// Collects all output without printing
#[derive(Default)]
pub struct CollectingSink {
    buffer: Mutex<String>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> String {
        self.buffer
            .lock()
            .map(|mut b| std::mem::take(&mut *b))
            .unwrap_or_default()
    }
}

impl OutputSink for CollectingSink {
    fn write(&self, text: &str) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push_str(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.write("a");
        sink.write("b\n");
        assert_eq!(sink.contents(), "ab\n");
        assert_eq!(sink.take(), "ab\n");
        assert_eq!(sink.contents(), "");
    }
}
