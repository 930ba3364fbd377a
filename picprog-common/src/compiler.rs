use core::fmt;

use crate::device::Device;
use crate::record::{ParseError, Record};
use crate::script::{Overflow, Script};
use crate::translator::{TranslateError, Translator};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    Parse(ParseError),
    Translate(TranslateError),
    ScriptBufferOverflow,
}

/// First failure of a pass, with the line it happened on.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Error {
    /// 1-based.
    pub line: usize,
    pub content: String,
    pub kind: ErrorKind,
}

impl From<ParseError> for ErrorKind {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<TranslateError> for ErrorKind {
    fn from(e: TranslateError) -> Self {
        Self::Translate(e)
    }
}

impl From<Overflow> for ErrorKind {
    fn from(_: Overflow) -> Self {
        Self::ScriptBufferOverflow
    }
}

/// One compilation pass: owns the translator state and the script.
#[derive(Debug, Clone)]
pub struct Compiler {
    translator: Translator,
    script: Script,
    line: usize,
}

impl Compiler {
    pub fn new(device: Device) -> Self {
        let profile = device.profile();
        Self {
            translator: Translator::new(profile),
            script: Script::new(profile.device_id),
            line: 0,
        }
    }

    /// Number of lines fed so far.
    pub fn lines(&self) -> usize {
        self.line
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Compiles the next line of the input. Empty lines are skipped.
    pub fn feed_line(&mut self, line: &str) -> Result<(), Error> {
        self.line += 1;
        if line.is_empty() {
            return Ok(());
        }

        self.interpret(line).map_err(|kind| Error {
            line: self.line,
            content: line.to_string(),
            kind,
        })
    }

    fn interpret(&mut self, line: &str) -> Result<(), ErrorKind> {
        let record = Record::parse(line)?;
        log::trace!(
            "line {}: type {} at {:#06x}, {} bytes",
            self.line,
            record.record_type(),
            record.address(),
            record.byte_count()
        );

        let decision = self.translator.translate(&record)?;
        self.script.emit(&decision)?;
        Ok(())
    }

    pub fn finish(self) -> Script {
        log::debug!(
            "{} lines, script {} bytes, last address {:#06x}",
            self.line,
            self.script.len(),
            self.translator.current()
        );
        self.script
    }
}

/// Runs a whole pass over `lines`, stopping at the first error.
pub fn compile<I, S>(device: Device, lines: I) -> Result<Script, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut compiler = Compiler::new(device);
    for line in lines {
        compiler.feed_line(line.as_ref())?;
    }
    Ok(compiler.finish())
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse(e) => fmt::Display::fmt(e, f),
            ErrorKind::Translate(e) => fmt::Display::fmt(e, f),
            ErrorKind::ScriptBufferOverflow => fmt::Display::fmt(&Overflow, f),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} in '{}'", self.line, self.kind, self.content)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Parse(e) => Some(e),
            ErrorKind::Translate(e) => Some(e),
            ErrorKind::ScriptBufferOverflow => None,
        }
    }
}
