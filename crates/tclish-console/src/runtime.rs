//! The embedded runtime seen by the console, and its tclish implementation.

use crate::error::{ConsoleError, Result};
use crate::vfs::{normalize, VirtualFs};
use std::sync::{Arc, RwLock};
use tclish_core::{Interpreter, InterpreterConfig, OutputSink, Reply, StdoutSink, Task};
use tracing::{debug, info};

/// Operations the console needs from an embedded interpreter
pub trait EmbeddedRuntime {
    /// Evaluate source text, returning its value or the error text
    fn execute(&mut self, source: &str) -> std::result::Result<String, String>;

    /// Unpack a zip archive into the virtual filesystem
    fn unpack_archive(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Import a module previously unpacked into the virtual filesystem
    fn import_module(&mut self, name: &str) -> Result<()>;

    /// Run up to `count` due events, returning how many ran
    fn process_events(&mut self, count: usize) -> usize;
}

/// `tclish_core` interpreter with a virtual filesystem and `source`
pub struct TclishRuntime {
    interpreter: Interpreter,
    vfs: Arc<RwLock<VirtualFs>>,
}

impl TclishRuntime {
    pub fn new(config: InterpreterConfig) -> Result<Self> {
        Self::with_output(config, Arc::new(StdoutSink))
    }

    pub fn with_output(config: InterpreterConfig, output: Arc<dyn OutputSink>) -> Result<Self> {
        let mut interpreter = Interpreter::with_output(config, output)?;
        let vfs = Arc::new(RwLock::new(VirtualFs::new()));

        let files = Arc::clone(&vfs);
        let added = interpreter.add_command(
            "source",
            move |interp: &mut Interpreter, task: &mut Task, args: &[String]| {
                source(&files, interp, task, args)
            },
            HELP_SOURCE,
        );
        if let Err(e) = added {
            debug!("Keeping existing source command: {}", e);
        }

        Ok(Self { interpreter, vfs })
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Snapshot of the virtual filesystem
    pub fn files(&self) -> VirtualFs {
        match self.vfs.read() {
            Ok(vfs) => vfs.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn read_file(&self, path: &str) -> Option<String> {
        let vfs = match self.vfs.read() {
            Ok(vfs) => vfs,
            Err(poisoned) => poisoned.into_inner(),
        };
        vfs.read(path).map(String::from)
    }
}

/// Candidate entry points of module `name`
pub fn module_paths(name: &str) -> [String; 2] {
    let name = normalize(name);
    [format!("{}/init.tcl", name), format!("{}.tcl", name)]
}

impl EmbeddedRuntime for TclishRuntime {
    fn execute(&mut self, source: &str) -> std::result::Result<String, String> {
        self.interpreter.run(source).into_result()
    }

    fn unpack_archive(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut vfs = match self.vfs.write() {
            Ok(vfs) => vfs,
            Err(poisoned) => poisoned.into_inner(),
        };
        let added = vfs.unpack_zip(bytes)?;
        info!("Unpacked {} files", added);
        Ok(added)
    }

    fn import_module(&mut self, name: &str) -> Result<()> {
        let found = module_paths(name)
            .into_iter()
            .find_map(|path| self.read_file(&path).map(|code| (path, code)));
        let Some((path, code)) = found else {
            return Err(ConsoleError::ModuleNotFound(name.to_string()));
        };

        let mut task = self.interpreter.new_task(&code);
        let label = format!("import {}", path);
        match self.interpreter.eval(&mut task, &code, Vec::new(), Some(&label)) {
            Reply::Error(message) => Err(ConsoleError::Import {
                module: name.to_string(),
                message,
            }),
            _ => {
                info!("Imported module {} from {}", name, path);
                Ok(())
            }
        }
    }

    fn process_events(&mut self, count: usize) -> usize {
        self.interpreter.process_events(count)
    }
}

fn source(
    files: &RwLock<VirtualFs>,
    interp: &mut Interpreter,
    task: &mut Task,
    args: &[String],
) -> Reply {
    let Some((path, rest)) = args.split_first() else {
        return task.error("source needs a file name", "source");
    };
    let code = {
        let vfs = match files.read() {
            Ok(vfs) => vfs,
            Err(poisoned) => poisoned.into_inner(),
        };
        vfs.read(path).map(String::from)
    };
    match code {
        Some(code) => {
            let label = format!("source {}", path);
            interp.eval(task, &code, rest.to_vec(), Some(&label))
        }
        None => task.error(format!("file {} not found", path), "source"),
    }
}

const HELP_SOURCE: &str = "usage:
  source <path> [<args>...]

evaluates the file <path> of the unpacked bundle with <args>
";

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tclish_core::CollectingSink;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn bundle(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn runtime() -> TclishRuntime {
        TclishRuntime::with_output(
            InterpreterConfig::default(),
            Arc::new(CollectingSink::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_execute_splits_value_and_error() {
        let mut rt = runtime();
        assert_eq!(rt.execute("+ 1 2"), Ok("3".to_string()));
        assert!(rt.execute("error nope").unwrap_err().starts_with("<error> nope"));
    }

    #[test]
    fn test_unpack_after_poisoned_lock() {
        let mut rt = runtime();
        let vfs = Arc::clone(&rt.vfs);
        let _ = std::thread::spawn(move || {
            let _guard = vfs.write().unwrap();
            panic!("writer died");
        })
        .join();
        assert!(rt.vfs.is_poisoned());

        let bytes = bundle(&[("m.tcl", "db set from m")]);
        assert_eq!(rt.unpack_archive(&bytes).unwrap(), 1);
        rt.import_module("m").unwrap();
        assert_eq!(rt.execute("db get from"), Ok("m".to_string()));
    }

    #[test]
    fn test_import_prefers_init_file() {
        let mut rt = runtime();
        let bytes = bundle(&[
            ("game/init.tcl", "defproc greet {join hello, [args 1]}\nsource game/extra.tcl"),
            ("game/extra.tcl", "db set loaded yes"),
            ("game.tcl", "error wrong"),
        ]);
        assert_eq!(rt.unpack_archive(&bytes).unwrap(), 3);
        rt.import_module("game").unwrap();
        assert_eq!(rt.execute("greet bob"), Ok("hello,bob".to_string()));
        assert_eq!(rt.execute("db get loaded"), Ok("yes".to_string()));
    }

    #[test]
    fn test_import_single_file_module() {
        let mut rt = runtime();
        rt.unpack_archive(&bundle(&[("util.tcl", "defproc twice {* 2 [args 1]}")]))
            .unwrap();
        rt.import_module("util").unwrap();
        assert_eq!(rt.execute("twice 4"), Ok("8".to_string()));
    }

    #[test]
    fn test_import_failures() {
        let mut rt = runtime();
        assert!(matches!(
            rt.import_module("missing"),
            Err(ConsoleError::ModuleNotFound(_))
        ));
        rt.unpack_archive(&bundle(&[("bad.tcl", "error broken")])).unwrap();
        assert!(matches!(
            rt.import_module("bad"),
            Err(ConsoleError::Import { .. })
        ));
    }

    #[test]
    fn test_source_missing_file() {
        let mut rt = runtime();
        let error = rt.execute("source nowhere.tcl").unwrap_err();
        assert!(error.starts_with("<source> file nowhere.tcl not found"));
    }
}
