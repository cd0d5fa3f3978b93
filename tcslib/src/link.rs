use crate::protocol::crc::CrcCcitt;
use crate::protocol::frame::{self, Address, Frame, FrameError, RawFrame};
use crate::protocol::response::{self, Reply};
use crate::protocol::serialize::SerializerIo;
use crate::protocol::StreamParser;

/// Re-export to allow using [Link] with [std::io] streams.
#[cfg(feature = "std")]
pub use embedded_io_adapters::std::FromStd;

/// An error type for [Link].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError<E> {
    /// EOF in underlying stream.
    UnexpectedEof,
    /// Other IO error in underlying stream.
    Io(E),
}

#[cfg(feature = "std")]
impl<E> std::error::Error for LinkError<E> where E: core::fmt::Debug {}

impl<E> core::fmt::Display for LinkError<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected eof"),
            Self::Io(e) => write!(f, "io error: {:?}", e),
        }
    }
}

impl<E> From<E> for LinkError<E> {
    fn from(other: E) -> Self {
        Self::Io(other)
    }
}

/// The outcome of one read pass over a [Link].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkRead<T> {
    /// A complete frame addressed to us.
    Frame(T),
    /// A complete candidate span that failed validation.
    Bad(FrameError),
    /// No complete frame yet; call again.
    Pending,
}

/// One endpoint of the serial link: the streaming parser fed from a
/// byte source, and frame serialization into a byte sink.
#[derive(Clone)]
pub struct Link<F> {
    port: F,
    parser: StreamParser,
    crc: CrcCcitt,
    local: Address,
    pending: [u8; 64],
    pos: usize,
    len: usize,
}

/// A [Link] over an [std::io] port.
#[cfg(feature = "std")]
pub type LinkStd<F> = Link<FromStd<F>>;

impl<F> Link<F> {
    /// Create a new link endpoint answering to `local`.
    pub fn new(local: Address, port: F) -> Self {
        Self {
            port,
            parser: StreamParser::new(),
            crc: CrcCcitt::new(),
            local,
            pending: [0; 64],
            pos: 0,
            len: 0,
        }
    }

    /// Release the underlying port.
    pub fn free(self) -> F {
        self.port
    }

    /// Get the underlying port.
    pub fn port(&self) -> &F {
        &self.port
    }

    /// Get the underlying port, mutably.
    ///
    /// Using this won't confuse the link, but it might cause you to
    /// miss frames if you are not careful.
    pub fn port_mut(&mut self) -> &mut F {
        &mut self.port
    }

    /// The address this endpoint answers to.
    pub fn local(&self) -> Address {
        self.local
    }

    /// Pull more bytes from the port when the internal buffer is dry.
    fn refill(&mut self) -> Result<(), LinkError<F::Error>>
    where
        F: embedded_io::Read,
    {
        if self.pos >= self.len {
            self.pos = 0;
            self.len = 0;
            let amt = self.port.read(&mut self.pending)?;
            if amt == 0 {
                // end of file is an error
                return Err(LinkError::UnexpectedEof);
            }
            self.len = amt;
        }
        Ok(())
    }

    /// Read and validate one command frame, as the node side.
    ///
    /// Performs at most one port read per call, so a caller can
    /// interleave other work between passes.
    pub fn read_command(&mut self) -> Result<LinkRead<Frame>, LinkError<F::Error>>
    where
        F: embedded_io::Read,
    {
        self.refill()?;

        while self.pos < self.len {
            let byte = self.pending[self.pos];
            self.pos += 1;
            if let Some(span) = self.parser.push(byte) {
                return Ok(match frame::parse(&self.crc, span, self.local) {
                    Ok(f) => LinkRead::Frame(f),
                    Err(e) => LinkRead::Bad(e),
                });
            }
        }

        Ok(LinkRead::Pending)
    }

    /// Read and validate one frame without command resolution, as the
    /// host side reading replies.
    pub fn read_reply(&mut self) -> Result<LinkRead<RawFrame>, LinkError<F::Error>>
    where
        F: embedded_io::Read,
    {
        self.refill()?;

        while self.pos < self.len {
            let byte = self.pending[self.pos];
            self.pos += 1;
            if let Some(span) = self.parser.push(byte) {
                return Ok(match frame::parse_raw(&self.crc, span, self.local) {
                    Ok(f) => LinkRead::Frame(f),
                    Err(e) => LinkRead::Bad(e),
                });
            }
        }

        Ok(LinkRead::Pending)
    }

    /// Write a reply frame to the port.
    pub fn write(&mut self, reply: &Reply) -> Result<(), LinkError<F::Error>>
    where
        F: embedded_io::Write,
    {
        let mut ser = SerializerIo::new(&mut self.port);
        reply.write(&self.crc, &mut ser)?;
        self.port.flush()?;
        Ok(())
    }

    /// Write a command frame to the port, from our own address.
    pub fn write_command(
        &mut self,
        receiver: Address,
        frame_id: u8,
        data: &[u8],
    ) -> Result<(), LinkError<F::Error>>
    where
        F: embedded_io::Write,
    {
        let mut ser = SerializerIo::new(&mut self.port);
        response::write_frame(&self.crc, &mut ser, self.local, receiver, frame_id, &data)?;
        self.port.flush()?;
        Ok(())
    }
}

#[cfg(feature = "std")]
impl<F> LinkStd<F> {
    /// Create a new link endpoint over an [std::io] port.
    pub fn new_std(local: Address, port: F) -> Self {
        Self::new(local, FromStd::new(port))
    }
}
