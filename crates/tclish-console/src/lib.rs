pub mod bootstrap;
pub mod bundle;
pub mod config;
pub mod error;
pub mod palette;
pub mod repl;
pub mod runtime;
pub mod session;
pub mod vfs;

pub use bootstrap::{BootPlan, Bootstrap, Readiness};
pub use config::{ConsoleConfig, ConsoleOverrides};
pub use error::{ConsoleError, Result};
pub use palette::{Palette, PaletteVariant};
pub use runtime::{EmbeddedRuntime, TclishRuntime};
pub use session::{LogView, MemoryView, OutputLog, OutputRecord, Session, TerminalView};
