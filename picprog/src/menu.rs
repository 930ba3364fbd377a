use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use picprog_common::Device;

fn read_answer<R: BufRead>(input: &mut R) -> io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no answer"));
    }
    Ok(line.trim().to_string())
}

pub fn ask_input<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<PathBuf> {
    loop {
        writeln!(out, "Input HEX file name?")?;
        out.flush()?;
        let name = read_answer(input)?;
        if !name.is_empty() {
            return Ok(PathBuf::from(name));
        }
    }
}

/// Lists the supported devices until one is picked, by number or by name.
pub fn select_device<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Device> {
    loop {
        writeln!(out, "Select the PIC to program:")?;
        for d in Device::ALL {
            writeln!(out, "{}", d)?;
        }
        writeln!(out, "Number?")?;
        out.flush()?;

        match read_answer(input)?.parse::<Device>() {
            Ok(d) => return Ok(d),
            Err(e) => log::debug!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn device() {
        let mut out = Vec::new();
        let d = select_device(&mut Cursor::new("3\n"), &mut out).unwrap();
        assert_eq!(d, Device::Pic16F1847);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Select the PIC to program:\n\
             1: PIC16F690\n\
             2: PIC12F675\n\
             3: PIC16F1847\n\
             4: PIC16F1936\n\
             Number?\n"
        );
    }

    #[test]
    fn device_retry() {
        let mut out = Vec::new();
        let d = select_device(&mut Cursor::new("0\n\nx\npic12f675\n"), &mut out).unwrap();
        assert_eq!(d, Device::Pic12F675);
        assert_eq!(String::from_utf8(out).unwrap().matches("Number?").count(), 4);

        let e = select_device(&mut Cursor::new("7\n"), &mut Vec::new()).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn input_name() {
        let mut out = Vec::new();
        let p = ask_input(&mut Cursor::new("\n  blink.hex \r\n"), &mut out).unwrap();
        assert_eq!(p, PathBuf::from("blink.hex"));

        assert!(ask_input(&mut Cursor::new(""), &mut Vec::new()).is_err());
    }
}
