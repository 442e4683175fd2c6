//! Field filter for home-automation switch updates.
//!
//! A home-automation controller publishes device state as pretty-printed
//! JSON, several hundred bytes per update, of which the device only needs two
//! values:
//!
//! ```text
//! {
//! 	"Battery" : 255,
//! 	"idx" : 42,
//! 	"name" : "Kitchen light",
//! 	"nvalue" : 1,
//! 	...
//! }
//! ```
//!
//! [`FieldFilter`] consumes a PUBLISH body one byte at a time and decides
//! for each byte whether the reassembler stages something in its place or
//! drops it. The topic is replaced by the one-byte placeholder `d`, and
//! `idx` and `nvalue` are captured into [`FilterFields`] on the way.
//!
//! Matching is positional. A field starts at `\n`, ends at the next `,`, and
//! only the first [`FIELD_SCRATCH_LEN`] - 1 bytes of it are ever examined.

use heapless::String;

/// Size of the scratch buffer a candidate field is collected in.
pub const FIELD_SCRATCH_LEN: usize = 20;

const IDX_PREFIX: &[u8] = b"\n\t\"idx\"";
const IDX_VALUE_OFFSET: usize = 10;
const NVALUE_PREFIX: &[u8] = b"\n\t\"nval";
const NVALUE_VALUE_OFFSET: usize = 13;

const TOPIC_LENGTH_MSB: &[u8] = &[0x00];
const TOPIC_LENGTH_LSB_AND_TOPIC: &[u8] = &[0x01, b'd'];

/// Values extracted from a filtered PUBLISH.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterFields {
    /// Device index, as its decimal text.
    pub idx: String<6>,
    /// Switch state, a single digit.
    pub nvalue: String<1>,
}

impl FilterFields {
    /// Whether both values were found.
    pub fn is_complete(&self) -> bool {
        !self.idx.is_empty() && !self.nvalue.is_empty()
    }

    /// The device index as a number.
    pub fn idx_value(&self) -> Option<u32> {
        self.idx.parse().ok()
    }

    /// The switch state as a number.
    pub fn nvalue_value(&self) -> Option<u8> {
        self.nvalue.parse().ok()
    }
}

/// Position of the filter within a PUBLISH body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterStep {
    /// Expecting the high byte of the topic length.
    TopicLengthMsb,
    /// Expecting the low byte of the topic length.
    TopicLengthLsb,
    /// Skipping bytes until a `\n` opens a candidate field.
    FindFieldStart,
    /// Collecting a candidate field until its `,`.
    CaptureField,
    /// Every wanted value is in; dropping the rest of the body.
    DrainToEnd,
}

/// A value the filter just captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    /// `idx`
    Idx,
    /// `nvalue`
    Nvalue,
}

/// What the reassembler should do with the byte it just fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEffect {
    /// Stage these bytes instead of the input byte.
    Stage(&'static [u8]),
    /// Drop the input byte.
    Discard,
    /// Drop the input byte; it completed a captured value.
    Captured(Field),
}

/// Byte-at-a-time filter over a PUBLISH body.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    step: FilterStep,
    scratch: [u8; FIELD_SCRATCH_LEN],
    scratch_len: usize,
    fields: FilterFields,
}

impl Default for FieldFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldFilter {
    /// A filter positioned at the start of a PUBLISH body.
    pub const fn new() -> Self {
        Self {
            step: FilterStep::TopicLengthMsb,
            scratch: [0; FIELD_SCRATCH_LEN],
            scratch_len: 0,
            fields: FilterFields {
                idx: String::new(),
                nvalue: String::new(),
            },
        }
    }

    /// Rewind to the start of a body and forget captured values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Current step.
    pub fn step(&self) -> FilterStep {
        self.step
    }

    /// Values captured so far.
    pub fn fields(&self) -> &FilterFields {
        &self.fields
    }

    /// Feed the next body byte.
    pub fn feed(&mut self, byte: u8) -> FilterEffect {
        match self.step {
            FilterStep::TopicLengthMsb => {
                self.step = FilterStep::TopicLengthLsb;
                FilterEffect::Stage(TOPIC_LENGTH_MSB)
            }
            FilterStep::TopicLengthLsb => {
                self.step = FilterStep::FindFieldStart;
                FilterEffect::Stage(TOPIC_LENGTH_LSB_AND_TOPIC)
            }
            FilterStep::FindFieldStart => {
                if byte == b'\n' {
                    self.scratch[0] = byte;
                    self.scratch_len = 1;
                    self.step = FilterStep::CaptureField;
                }
                FilterEffect::Discard
            }
            FilterStep::CaptureField => self.capture(byte),
            FilterStep::DrainToEnd => FilterEffect::Discard,
        }
    }

    fn capture(&mut self, byte: u8) -> FilterEffect {
        self.scratch[self.scratch_len] = byte;
        self.scratch_len += 1;

        if byte != b',' {
            if self.scratch_len >= FIELD_SCRATCH_LEN - 1 {
                // too long to be a wanted field
                self.step = FilterStep::FindFieldStart;
            }
            return FilterEffect::Discard;
        }

        let comma = self.scratch_len - 1;
        let field = &self.scratch[..comma];
        self.step = FilterStep::FindFieldStart;

        if field.starts_with(IDX_PREFIX) {
            let value = field.get(IDX_VALUE_OFFSET..).unwrap_or_default();
            let value = &value[..value.len().min(self.fields.idx.capacity())];
            self.fields.idx.clear();
            if let Ok(text) = core::str::from_utf8(value) {
                // cannot overflow, the value was cut to capacity
                let _ = self.fields.idx.push_str(text);
            }
            trace!("filter: idx captured");
            return FilterEffect::Captured(Field::Idx);
        }

        if field.starts_with(NVALUE_PREFIX) {
            self.fields.nvalue.clear();
            if let Some(&digit) = field.get(NVALUE_VALUE_OFFSET) {
                if digit.is_ascii() {
                    let _ = self.fields.nvalue.push(char::from(digit));
                }
            }
            self.step = FilterStep::DrainToEnd;
            trace!("filter: nvalue captured");
            return FilterEffect::Captured(Field::Nvalue);
        }

        FilterEffect::Discard
    }
}
