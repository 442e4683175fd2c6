//! Stream reassembly.
//!
//! The transport hands the engine whatever arrived in one segment: part of a
//! message, exactly one, or several back to back. [`Reassembler`] turns that
//! byte stream into whole messages, one at a time, staged in a fixed scratch
//! buffer of `P` bytes. Its state survives from one segment to the next.
//!
//! Two modes are available:
//!
//! - [`Mode::Generic`] copies every message verbatim. Messages larger than
//!   the scratch buffer are drained and dropped.
//! - [`Mode::Filtering`] keeps only what a switch-controlled device needs.
//!   PUBLISH bodies go through a [`FieldFilter`] and are staged as a 6-byte
//!   placeholder message; the extracted values are available from
//!   [`Reassembler::fields`]. Other messages are kept verbatim when their body
//!   is small and dropped otherwise.
//!
//! ```rust
//! use libmqtt::network::application::mqtt::reassembler::{Mode, Progress, Reassembler};
//!
//! let mut reassembler = Reassembler::<64>::new(Mode::Generic, 59);
//!
//! // a CONNACK split over two segments, followed by a PINGRESP
//! let (n, progress) = reassembler.advance(&[0x20, 0x02]).unwrap();
//! assert_eq!((n, progress), (2, Progress::Pending));
//!
//! let segment = [0x00, 0x00, 0xD0, 0x00];
//! let (n, progress) = reassembler.advance(&segment).unwrap();
//! assert_eq!((n, progress), (2, Progress::Staged));
//! assert_eq!(reassembler.staged(), Some(&[0x20, 0x02, 0x00, 0x00][..]));
//!
//! reassembler.reset();
//! let (n, progress) = reassembler.advance(&segment[n..]).unwrap();
//! assert_eq!((n, progress), (2, Progress::Staged));
//! ```

use super::codec::ControlType;
use super::error::Error;
use super::filter::{FieldFilter, FilterEffect, FilterFields};

/// Smallest scratch buffer a reassembler accepts.
pub const MIN_SCRATCH_LEN: usize = 8;

const PLACEHOLDER_PAYLOAD: u8 = b'}';
const MAX_SINGLE_BYTE_LENGTH: usize = 127;

/// How messages are staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Stage every message verbatim.
    Generic,
    /// Stage PUBLISH messages as placeholders plus extracted fields.
    Filtering,
}

/// Outcome of [`Reassembler::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Progress {
    /// The input ran out before a message was complete.
    Pending,
    /// A complete message is staged.
    Staged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Control,
    Length,
    Body,
    Discard,
    Complete,
}

/// Segment-to-message reassembler with a `P`-byte scratch buffer.
#[derive(Debug, Clone)]
pub struct Reassembler<const P: usize> {
    mode: Mode,
    max_unfiltered_body: usize,
    buf: [u8; P],
    len: usize,
    remaining_length: u32,
    shift: u32,
    body_left: usize,
    phase: Phase,
    filtering_publish: bool,
    filter: FieldFilter,
}

impl<const P: usize> Reassembler<P> {
    /// Create a reassembler.
    ///
    /// `max_unfiltered_body` bounds the body of non-PUBLISH messages kept in
    /// filtering mode. It is ignored in generic mode.
    pub const fn new(mode: Mode, max_unfiltered_body: usize) -> Self {
        const { assert!(P >= MIN_SCRATCH_LEN, "reassembly scratch buffer too small") };
        Self {
            mode,
            max_unfiltered_body,
            buf: [0; P],
            len: 0,
            remaining_length: 0,
            shift: 0,
            body_left: 0,
            phase: Phase::Control,
            filtering_publish: false,
            filter: FieldFilter::new(),
        }
    }

    /// The staging mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Consume bytes from `input` until a message is staged or the input
    /// ends. Returns the number of bytes consumed.
    ///
    /// While a message is staged no input is consumed; call
    /// [`reset`](Self::reset) once it has been dispatched.
    pub fn advance(&mut self, input: &[u8]) -> Result<(usize, Progress), Error> {
        if self.phase == Phase::Complete {
            return Ok((0, Progress::Staged));
        }
        for (i, &byte) in input.iter().enumerate() {
            if self.consume(byte)? == Progress::Staged {
                return Ok((i + 1, Progress::Staged));
            }
        }
        Ok((input.len(), Progress::Pending))
    }

    /// The staged message, once [`advance`](Self::advance) reported
    /// [`Progress::Staged`].
    pub fn staged(&self) -> Option<&[u8]> {
        (self.phase == Phase::Complete).then(|| &self.buf[..self.len])
    }

    /// Values extracted from the staged PUBLISH in filtering mode.
    pub fn fields(&self) -> Option<&FilterFields> {
        (self.phase == Phase::Complete && self.filtering_publish).then(|| self.filter.fields())
    }

    /// Forget the current message and wait for the next control byte.
    pub fn reset(&mut self) {
        self.len = 0;
        self.remaining_length = 0;
        self.shift = 0;
        self.body_left = 0;
        self.phase = Phase::Control;
        self.filtering_publish = false;
        self.filter.reset();
    }

    fn consume(&mut self, byte: u8) -> Result<Progress, Error> {
        match self.phase {
            Phase::Control => {
                self.reset();
                self.push(byte);
                self.filtering_publish =
                    self.mode == Mode::Filtering && byte >> 4 == ControlType::Publish as u8;
                self.phase = Phase::Length;
                Ok(Progress::Pending)
            }
            Phase::Length => self.length_byte(byte),
            Phase::Body => Ok(self.body_byte(byte)),
            Phase::Discard => {
                self.body_left -= 1;
                if self.body_left == 0 {
                    self.reset();
                }
                Ok(Progress::Pending)
            }
            Phase::Complete => Ok(Progress::Staged),
        }
    }

    fn length_byte(&mut self, byte: u8) -> Result<Progress, Error> {
        if self.shift == 28 {
            warn!("reassembler: remaining length longer than 4 bytes");
            self.reset();
            return Err(Error::InvalidRemainingLength);
        }
        self.remaining_length |= u32::from(byte & 0x7F) << self.shift;
        self.shift += 7;

        // filtered messages keep a single length byte, rewritten at the end
        if self.mode == Mode::Generic || self.shift == 7 {
            self.push(byte);
        }
        if byte & 0x80 != 0 {
            return Ok(Progress::Pending);
        }
        Ok(self.begin_body())
    }

    fn begin_body(&mut self) -> Progress {
        self.body_left = self.remaining_length as usize;
        let fits = self.len + self.body_left <= P;
        let keep = match self.mode {
            Mode::Generic => fits,
            Mode::Filtering => {
                let limit = self.max_unfiltered_body.min(MAX_SINGLE_BYTE_LENGTH);
                self.filtering_publish || (fits && self.body_left <= limit)
            }
        };

        if !keep {
            debug!(
                "reassembler: dropping type {} message with {} byte body",
                self.buf[0] >> 4,
                self.body_left
            );
            self.phase = Phase::Discard;
            return Progress::Pending;
        }
        if self.body_left == 0 {
            return self.complete();
        }
        self.phase = Phase::Body;
        Progress::Pending
    }

    fn body_byte(&mut self, byte: u8) -> Progress {
        if self.filtering_publish {
            if let FilterEffect::Stage(bytes) = self.filter.feed(byte) {
                for &b in bytes {
                    self.push(b);
                }
            }
        } else {
            self.push(byte);
        }
        self.body_left -= 1;
        if self.body_left == 0 {
            return self.complete();
        }
        Progress::Pending
    }

    fn complete(&mut self) -> Progress {
        if self.mode == Mode::Filtering {
            if self.filtering_publish {
                self.push(PLACEHOLDER_PAYLOAD);
            }
            // every body staged in this mode fits a single length byte
            self.buf[1] = (self.len - 2) as u8;
        }
        self.phase = Phase::Complete;
        trace!("reassembler: staged {} bytes", self.len);
        Progress::Staged
    }

    fn push(&mut self, byte: u8) {
        if let Some(slot) = self.buf.get_mut(self.len) {
            *slot = byte;
            self.len += 1;
        }
    }
}
