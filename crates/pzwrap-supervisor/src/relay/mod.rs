//! Relays between the terminal and the server.
//!
//! Each launch cycle runs one input relay (terminal -> server stdin) and one
//! output relay (server stdout -> terminal). The server's stderr is drained
//! into the log so a full pipe can never stall it.

pub mod input;
pub mod output;
pub mod stderr;

pub use input::{InputRelayExit, intercept, run_input_relay};
pub use output::{OutputRelayExit, run_output_relay};
pub use stderr::spawn_stderr_drain;

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Read one line, decoding invalid UTF-8 lossily.
///
/// The server is a JVM and may print bytes in the platform charset;
/// `BufReader::lines()` would end the relay on the first invalid byte.
/// Returns `None` at end of stream. The line terminator is stripped.
pub(crate) async fn read_lossy_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    Ok(Some(decode_line(buf)))
}

/// Strip a trailing `\n` or `\r\n` and decode the rest lossily.
pub(crate) fn decode_line(buf: &mut Vec<u8>) -> String {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    String::from_utf8_lossy(buf).into_owned()
}
