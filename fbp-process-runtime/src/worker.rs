//! The child-process side of a process-hosted component.
//!
//! A binary that wants to run as a process-hosted component calls
//! [`run_worker`] from `main`: it reads [`WireValue`] frames from stdin,
//! applies a transform, and writes the results to stdout until the host
//! closes its end of the pipe.

use std::io::{self, BufReader, BufWriter};

use crate::codec::{read_frame, write_frame};
use crate::value::WireValue;

/// Drive a worker loop over stdin/stdout: for each input frame, call `f`
/// and write back whatever it returns (`None` means "consume, emit
/// nothing" — used to implement filters).
///
/// # Errors
/// Propagates I/O or framing errors from the pipe.
pub fn run_worker<F>(mut f: F) -> io::Result<()>
where
    F: FnMut(WireValue) -> Option<WireValue>,
{
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = BufWriter::new(stdout.lock());

    loop {
        let Some(input): Option<WireValue> = read_frame(&mut reader)? else {
            break;
        };
        if let Some(output) = f(input) {
            write_frame(&mut writer, &output)?;
        }
    }
    Ok(())
}
