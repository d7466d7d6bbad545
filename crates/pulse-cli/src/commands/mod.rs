pub mod encode;
pub mod process;
pub mod rules;

use std::io::Read;
use std::path::Path;

use pulse_core::PulseError;

/// Read a whole input file, or stdin when `path` is `None` or "-".
pub fn read_input(path: Option<&Path>) -> Result<String, PulseError> {
    match path {
        Some(p) if p != Path::new("-") => Ok(std::fs::read_to_string(p)?),
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
