//! Submissions, the append-only output log and its views.

use crate::bootstrap::Bootstrap;
use crate::error::Result;
use crate::palette::{Palette, PaletteVariant};
use crate::runtime::EmbeddedRuntime;
use rand::rngs::ThreadRng;
use std::io::Write;
use tracing::{debug, warn};

pub const EMPTY_INPUT: &str = "<empty>";
pub const EMPTY_MESSAGE: &str = "You didn't enter any code! please do.";

/// One rendered evaluation: the input and its value or error text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    input: String,
    output: String,
    is_error: bool,
}

impl OutputRecord {
    pub fn success(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            is_error: false,
        }
    }

    pub fn failure(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            is_error: true,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

/// Chronological records of a session; nothing is ever removed
#[derive(Debug, Default)]
pub struct OutputLog {
    records: Vec<OutputRecord>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: OutputRecord) -> &OutputRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(OutputRecord::is_error)
    }
}

/// Where appended records are shown
pub trait LogView {
    fn render(&mut self, record: &OutputRecord);

    /// Bring the newest record into view
    fn scroll_to_end(&mut self);
}

/// Renders records as text, colouring each element from a palette
pub struct TerminalView<W: Write> {
    out: W,
    palette: Option<(Palette, PaletteVariant)>,
    rng: ThreadRng,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            palette: None,
            rng: rand::thread_rng(),
        }
    }

    pub fn with_palette(mut self, palette: Palette, variant: PaletteVariant) -> Self {
        self.palette = Some((palette, variant));
        self
    }

    /// Colour `text` as a fresh element
    pub fn paint(&mut self, text: &str) -> String {
        match &self.palette {
            Some((palette, variant)) => palette.pick(*variant, &mut self.rng).paint(text),
            None => text.to_string(),
        }
    }

    pub fn banner(&mut self, text: &str) {
        let line = self.paint(text);
        self.write_line(&line);
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!("Failed to write to the console: {}", e);
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> LogView for TerminalView<W> {
    fn render(&mut self, record: &OutputRecord) {
        let echo = self.paint(&format!("> {}", record.input()));
        self.write_line(&echo);
        if record.is_error() {
            let marked: Vec<String> = record
                .output()
                .lines()
                .map(|line| format!("! {}", line))
                .collect();
            self.write_line(&marked.join("\n"));
        } else if !record.output().is_empty() {
            self.write_line(record.output());
        }
    }

    fn scroll_to_end(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!("Failed to flush the console: {}", e);
        }
    }
}

/// Keeps rendered records in memory
#[derive(Debug, Default)]
pub struct MemoryView {
    pub rendered: Vec<OutputRecord>,
    pub scrolls: usize,
    /// Number of records rendered when the view was last scrolled
    pub scrolled_at: usize,
}

impl LogView for MemoryView {
    fn render(&mut self, record: &OutputRecord) {
        self.rendered.push(record.clone());
    }

    fn scroll_to_end(&mut self) {
        self.scrolls += 1;
        self.scrolled_at = self.rendered.len();
    }
}

/// The submission handler: waits for the runtime, evaluates, appends
pub struct Session<R, V> {
    bootstrap: Bootstrap<R>,
    log: OutputLog,
    view: V,
}

fn append<V: LogView>(log: &mut OutputLog, view: &mut V, record: OutputRecord) {
    let record = log.append(record);
    view.render(record);
    view.scroll_to_end();
}

impl<R: EmbeddedRuntime, V: LogView> Session<R, V> {
    pub fn new(bootstrap: Bootstrap<R>, view: V) -> Self {
        Self {
            bootstrap,
            log: OutputLog::new(),
            view,
        }
    }

    /// Wait for the bootstrap to settle, rendering its status records
    pub fn ready(&mut self) -> Result<&mut R> {
        let log = &mut self.log;
        let view = &mut self.view;
        self.bootstrap.wait(|record| append(log, view, record))
    }

    /// Evaluate one submission. Empty input is answered without calling
    /// the runtime.
    pub fn submit(&mut self, input: &str) -> Result<&OutputRecord> {
        let runtime = {
            let log = &mut self.log;
            let view = &mut self.view;
            self.bootstrap.wait(|record| append(log, view, record))?
        };

        let record = if input.is_empty() {
            OutputRecord::failure(EMPTY_INPUT, EMPTY_MESSAGE)
        } else {
            debug!(len = input.len(), "Submitting");
            match runtime.execute(input) {
                Ok(value) => OutputRecord::success(input, value),
                Err(error) => OutputRecord::failure(input, error),
            }
        };
        append(&mut self.log, &mut self.view, record);
        Ok(&self.log.records()[self.log.len() - 1])
    }

    /// Run due events until none are left, returning how many ran
    pub fn drain_events(&mut self) -> Result<usize> {
        let runtime = self.ready()?;
        let mut total = 0;
        loop {
            let ran = runtime.process_events(64);
            if ran == 0 {
                return Ok(total);
            }
            total += ran;
        }
    }

    pub fn log(&self) -> &OutputLog {
        &self.log
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_parts(self) -> (Bootstrap<R>, OutputLog, V) {
        (self.bootstrap, self.log, self.view)
    }
}
