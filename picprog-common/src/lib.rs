pub mod compiler;
pub mod device;
pub mod image;
pub mod record;
pub mod script;
pub mod translator;

pub use compiler::{compile, Compiler, Error, ErrorKind};
pub use device::{Device, Profile};
