//! Serial line transport.
//!
//! A reader thread splits the input into lines and hands them to the
//! control thread over a channel. Replies go the other way through a
//! bounded channel to a writer thread, so the cycle blocks on neither side
//! of a device or pipe.

use crate::report::Reply;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TryRecvError, TrySendError};
use std::thread;
use tracing::{debug, info, warn};

/// Reply lines buffered for the writer thread before `send` fails.
pub const REPLY_BACKLOG: usize = 256;

enum Outbound {
    /// Written on the calling thread.
    Direct(Box<dyn Write + Send>),
    /// Queued for the `serial-tx` thread.
    Queued(SyncSender<String>),
}

pub struct SerialLink {
    rx: Receiver<String>,
    out: Outbound,
    closed: bool,
}

impl SerialLink {
    /// Lines from stdin, replies to stdout.
    pub fn stdio() -> io::Result<Self> {
        Self::from_parts(io::stdin(), io::stdout())
    }

    /// A tty or pipe opened for reading and writing.
    pub fn open(path: &Path) -> io::Result<Self> {
        let port = OpenOptions::new().read(true).write(true).open(path)?;
        let writer = port.try_clone()?;
        info!(port = %path.display(), "serial port opened");
        Self::from_parts(port, writer)
    }

    /// Spawn the reader thread over `reader` and the writer thread over
    /// `writer`.
    pub fn from_parts<R, W>(reader: R, writer: W) -> io::Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (line_tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("serial-rx".to_string())
            .spawn(move || read_lines(reader, line_tx))?;

        let (reply_tx, reply_rx) = mpsc::sync_channel(REPLY_BACKLOG);
        thread::Builder::new()
            .name("serial-tx".to_string())
            .spawn(move || write_lines(writer, reply_rx))?;

        Ok(Self {
            rx,
            out: Outbound::Queued(reply_tx),
            closed: false,
        })
    }

    /// In-process link: lines come through the returned sender and replies
    /// are written to `writer` as `send` is called.
    pub fn with_sender<W>(writer: W) -> (Sender<String>, Self)
    where
        W: Write + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let link = Self {
            rx,
            out: Outbound::Direct(Box::new(writer)),
            closed: false,
        };
        (tx, link)
    }

    /// Next complete line, if one arrived.
    pub fn try_recv(&mut self) -> Option<String> {
        match self.rx.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.closed {
                    info!("serial input closed");
                    self.closed = true;
                }
                None
            }
        }
    }

    /// Write one reply line. A queued link fails with `WouldBlock` once
    /// `REPLY_BACKLOG` lines are waiting, rather than stall the cycle.
    pub fn send(&mut self, reply: &Reply) -> io::Result<()> {
        match &mut self.out {
            Outbound::Direct(writer) => {
                writeln!(writer, "{reply}")?;
                writer.flush()
            }
            Outbound::Queued(tx) => match tx.try_send(reply.to_string()) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    "reply backlog full, host not reading",
                )),
                Err(TrySendError::Disconnected(_)) => Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "serial writer stopped",
                )),
            },
        }
    }

    /// Input side hung up; replies can still be written.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

fn read_lines<R: Read>(reader: R, tx: Sender<String>) {
    for line in BufReader::new(reader).lines() {
        match line {
            Ok(line) => {
                if tx.send(line).is_err() {
                    debug!("control thread gone, reader exiting");
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "serial read failed");
                return;
            }
        }
    }
}

fn write_lines<W: Write>(mut writer: W, rx: Receiver<String>) {
    for line in rx {
        if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            warn!(error = %e, "serial write failed");
            return;
        }
    }
    debug!("control thread gone, writer exiting");
}
