use std::io::{self, Write};

use crate::message::InboundMessage;

/// Writes each received message to an output stream, one line per message.
/// No validation or filtering: whatever arrives gets rendered and written.
pub struct MessageSink<W: Write> {
    out: W,
}

impl MessageSink<io::Stderr> {
    /// Sink over the process standard-error stream.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> MessageSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Render the message and write exactly one line. Write errors
    /// propagate to the caller.
    pub fn write(&mut self, message: &InboundMessage) -> io::Result<()> {
        writeln!(self.out, "{message}")
    }
}
