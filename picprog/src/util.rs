use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use picprog_common::image::{self, ImageError};
use picprog_common::script::{Instruction, Script};
use picprog_common::{Compiler, Device};

#[derive(Debug)]
pub enum Error {
    InputUnavailable(PathBuf, std::io::Error),
    Compile(picprog_common::Error),
    TemplateUnavailable(PathBuf, std::io::Error),
    Image(ImageError),
    OutputWrite(PathBuf, std::io::Error),
    Prompt(std::io::Error),
}

impl From<picprog_common::Error> for Error {
    fn from(e: picprog_common::Error) -> Self {
        Self::Compile(e)
    }
}

impl From<ImageError> for Error {
    fn from(e: ImageError) -> Self {
        Self::Image(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InputUnavailable(path, e) => {
                write!(f, "error reading input file {}: {}", path.display(), e)
            }
            Error::Compile(e) => write!(f, "{}", e),
            Error::TemplateUnavailable(path, e) => {
                write!(f, "error: open input '{}': {}", path.display(), e)
            }
            Error::Image(e) => write!(f, "{}", e),
            Error::OutputWrite(path, e) => {
                write!(f, "error: write output file {}: {}", path.display(), e)
            }
            Error::Prompt(e) => write!(f, "error reading answer: {}", e),
        }
    }
}

impl std::error::Error for Error {}

/// `FIRMWARE.HEX` becomes `FIRMWARE.COM`, a name without extension gets one.
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension("COM")
}

/// Compiles a HEX file line by line. The file is closed before returning.
pub fn compile_file(path: &Path, device: Device) -> Result<Script, Error> {
    let file = File::open(path).map_err(|e| Error::InputUnavailable(path.to_path_buf(), e))?;

    // raw bytes, so a stray non-ASCII byte fails as a bad digit on its line
    let mut compiler = Compiler::new(device);
    for line in BufReader::new(file).split(b'\n') {
        let mut line = line.map_err(|e| Error::InputUnavailable(path.to_path_buf(), e))?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        compiler.feed_line(&String::from_utf8_lossy(&line))?;
    }
    log::debug!("{} lines read from {}", compiler.lines(), path.display());

    Ok(compiler.finish())
}

fn read_template(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| Error::TemplateUnavailable(path.to_path_buf(), e))
}

/// Loader template followed by the script segment.
pub fn build_image(script: Script, template_path: &Path) -> Result<Vec<u8>, Error> {
    let template = read_template(template_path)?;
    image::compose(script, &template).map_err(|e| match e {
        ImageError::EmptyTemplate => Error::TemplateUnavailable(
            template_path.to_path_buf(),
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        ),
        e => e.into(),
    })
}

pub fn write_image(path: &Path, image: &[u8]) -> Result<(), Error> {
    std::fs::write(path, image).map_err(|e| Error::OutputWrite(path.to_path_buf(), e))
}

/// Compiles `input` and writes the finished image to `output`. Nothing is
/// written unless every step before it succeeded.
pub fn convert(
    input: &Path,
    output: &Path,
    loader: &Path,
    device: Device,
) -> Result<Summary, Error> {
    log::info!("compiling {} for {}", input.display(), device.name());
    let script = compile_file(input, device)?;

    let summary = summarize(&script);
    log::info!(
        "script: {} bytes, {} words in {} writes, {} skips{}",
        summary.bytes,
        summary.words,
        summary.writes,
        summary.skips,
        if summary.config { ", config region" } else { "" }
    );

    log::info!("writing the output programming COM {}", output.display());
    let image = build_image(script, loader)?;
    write_image(output, &image)?;

    Ok(summary)
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Summary {
    pub bytes: usize,
    pub words: usize,
    pub writes: usize,
    pub skips: usize,
    pub config: bool,
}

pub fn summarize(script: &Script) -> Summary {
    let mut summary = Summary {
        bytes: script.len(),
        ..Summary::default()
    };
    for i in script.instructions().flatten() {
        match i {
            Instruction::RegionTransition => summary.config = true,
            Instruction::Skip(_) => summary.skips += 1,
            Instruction::Write(words) => {
                summary.writes += 1;
                summary.words += words.len() / 2;
            }
        }
    }
    summary
}
