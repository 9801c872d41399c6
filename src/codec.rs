//! The interval state machine: renormalization, carry propagation, raw bit
//! I/O, and the symbol encode/decode entry points for both model flavors.

use crate::error::{Error, Result};
use crate::model::{AdaptiveModel, StaticModel, LENGTH_SHIFT};

/// Renormalization threshold: one byte is emitted or consumed whenever the
/// interval width drops below this.
pub const MIN_LENGTH: u32 = 0x0100_0000;

/// Initial interval width.
pub const MAX_LENGTH: u32 = 0xFFFF_FFFF;

/// Widest value accepted by [`ArithmeticCodec::put_bits`] and
/// [`ArithmeticCodec::get_bits`].
pub const MAX_BITS_PER_PUT: u32 = 20;

/// Slack appended to every code buffer so a renormalization burst right at
/// the capacity boundary stays in bounds; the overrun is still reported by
/// [`ArithmeticCodec::stop_encoder`].
const BUFFER_SLACK: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Idle,
    Encoding,
    Decoding,
}

/// Streaming arithmetic encoder/decoder over a byte buffer.
///
/// The codec keeps a current interval `[base, base + length)` over the
/// 32-bit range. Encoding narrows the interval to the slice a symbol's
/// probability occupies and emits the settled high-order bytes; decoding
/// runs the same narrowing in reverse, steered by a 32-bit window into the
/// compressed stream.
///
/// A codec is re-armed between sessions: set a buffer, start the encoder,
/// code symbols, stop; then hand the compressed bytes back in and run the
/// decoder. Operations are gated on the current mode and return
/// [`Error::ModeMismatch`] when misused.
///
/// Carries are propagated lazily: a `base` overflow walks back through the
/// already-emitted bytes, so the buffer stays addressable and mutable until
/// [`ArithmeticCodec::stop_encoder`] returns.
pub struct ArithmeticCodec {
    buffer: Vec<u8>,
    buffer_size: usize,
    base: u32,
    value: u32,
    length: u32,
    ac_pointer: usize,
    mode: Mode,
}

impl ArithmeticCodec {
    /// Create an idle codec with no buffer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            buffer_size: 0,
            base: 0,
            value: 0,
            length: 0,
            ac_pointer: 0,
            mode: Mode::Idle,
        }
    }

    /// Set the code buffer. Only legal while idle.
    ///
    /// With `user_buffer` the supplied bytes are adopted (the decode path
    /// hands the compressed stream back in this way); otherwise a buffer of
    /// `max_code_bytes` is allocated internally, reusing the previous
    /// allocation when it is already large enough.
    pub fn set_buffer(&mut self, max_code_bytes: usize, user_buffer: Option<Vec<u8>>) -> Result<()> {
        if self.mode != Mode::Idle {
            return Err(Error::ModeMismatch);
        }
        match user_buffer {
            Some(mut buffer) => {
                if buffer.len() < max_code_bytes + BUFFER_SLACK {
                    buffer.resize(max_code_bytes + BUFFER_SLACK, 0);
                }
                self.buffer = buffer;
                self.buffer_size = max_code_bytes;
            }
            None => {
                if max_code_bytes > self.buffer_size || self.buffer.is_empty() {
                    self.buffer = vec![0; max_code_bytes + BUFFER_SLACK];
                    self.buffer_size = max_code_bytes;
                }
            }
        }
        Ok(())
    }

    /// The code buffer contents. The first `n` bytes are the compressed
    /// stream once [`ArithmeticCodec::stop_encoder`] has returned `n`.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Switch to encoding mode.
    pub fn start_encoder(&mut self) -> Result<()> {
        if self.mode != Mode::Idle {
            return Err(Error::ModeMismatch);
        }
        if self.buffer_size == 0 {
            return Err(Error::BufferNotSet);
        }
        self.mode = Mode::Encoding;
        self.base = 0;
        self.length = MAX_LENGTH;
        self.ac_pointer = 0;
        Ok(())
    }

    /// Switch to decoding mode, priming the value window from the first
    /// four buffer bytes (big-endian).
    pub fn start_decoder(&mut self) -> Result<()> {
        if self.mode != Mode::Idle {
            return Err(Error::ModeMismatch);
        }
        if self.buffer_size == 0 {
            return Err(Error::BufferNotSet);
        }
        self.mode = Mode::Decoding;
        self.length = MAX_LENGTH;
        // the cursor sits on the last byte already consumed; renormalization
        // pre-increments before each read
        self.ac_pointer = 3;
        self.value = (u32::from(self.buffer[0]) << 24)
            | (u32::from(self.buffer[1]) << 16)
            | (u32::from(self.buffer[2]) << 8)
            | u32::from(self.buffer[3]);
        Ok(())
    }

    /// Finish encoding and return the number of compressed bytes.
    ///
    /// Flushes one or two trailing bytes so any decoder value inside the
    /// final interval reproduces the symbol sequence.
    pub fn stop_encoder(&mut self) -> Result<usize> {
        if self.mode != Mode::Encoding {
            return Err(Error::ModeMismatch);
        }
        self.mode = Mode::Idle;

        let init_base = self.base;
        if self.length > 2 * MIN_LENGTH {
            // interval still wide: one trailing byte suffices
            self.base = self.base.wrapping_add(MIN_LENGTH);
            self.length = MIN_LENGTH >> 1;
        } else {
            self.base = self.base.wrapping_add(MIN_LENGTH >> 1);
            self.length = MIN_LENGTH >> 9;
        }
        if init_base > self.base {
            self.propagate_carry();
        }
        self.renorm_enc_interval()?;

        let code_bytes = self.ac_pointer;
        if code_bytes > self.buffer_size {
            return Err(Error::BufferOverflow {
                used: code_bytes,
                capacity: self.buffer_size,
            });
        }
        Ok(code_bytes)
    }

    /// Finish decoding.
    pub fn stop_decoder(&mut self) -> Result<()> {
        if self.mode != Mode::Decoding {
            return Err(Error::ModeMismatch);
        }
        self.mode = Mode::Idle;
        Ok(())
    }

    /// Encode a single bit with a fixed half/half split.
    pub fn put_bit(&mut self, bit: bool) -> Result<()> {
        if self.mode != Mode::Encoding {
            return Err(Error::ModeMismatch);
        }
        self.length >>= 1;
        if bit {
            let init_base = self.base;
            self.base = self.base.wrapping_add(self.length);
            if init_base > self.base {
                self.propagate_carry();
            }
        }
        if self.length < MIN_LENGTH {
            self.renorm_enc_interval()?;
        }
        Ok(())
    }

    /// Decode a single bit encoded with [`ArithmeticCodec::put_bit`].
    pub fn get_bit(&mut self) -> Result<bool> {
        if self.mode != Mode::Decoding {
            return Err(Error::ModeMismatch);
        }
        self.length >>= 1;
        let bit = self.value >= self.length;
        if bit {
            self.value -= self.length;
        }
        if self.length < MIN_LENGTH {
            self.renorm_dec_interval();
        }
        Ok(bit)
    }

    /// Store `bits` bits of `data` verbatim, `1..=20` at a time.
    pub fn put_bits(&mut self, data: u32, bits: u32) -> Result<()> {
        if self.mode != Mode::Encoding {
            return Err(Error::ModeMismatch);
        }
        if bits == 0 || bits > MAX_BITS_PER_PUT {
            return Err(Error::InvalidBitCount(bits));
        }
        if data >= 1 << bits {
            return Err(Error::DataTooWide { data, bits });
        }
        self.length >>= bits;
        let init_base = self.base;
        self.base = self.base.wrapping_add(data * self.length);
        if init_base > self.base {
            self.propagate_carry();
        }
        if self.length < MIN_LENGTH {
            self.renorm_enc_interval()?;
        }
        Ok(())
    }

    /// Read back `bits` bits stored with [`ArithmeticCodec::put_bits`].
    pub fn get_bits(&mut self, bits: u32) -> Result<u32> {
        if self.mode != Mode::Decoding {
            return Err(Error::ModeMismatch);
        }
        if bits == 0 || bits > MAX_BITS_PER_PUT {
            return Err(Error::InvalidBitCount(bits));
        }
        self.length >>= bits;
        let data = self.value / self.length;
        self.value -= data * self.length;
        if self.length < MIN_LENGTH {
            self.renorm_dec_interval();
        }
        Ok(data)
    }

    /// Encode `symbol` with a static model.
    pub fn encode_static(&mut self, symbol: u32, model: &StaticModel) -> Result<()> {
        if self.mode != Mode::Encoding {
            return Err(Error::ModeMismatch);
        }
        if symbol >= model.data_symbols {
            return Err(Error::SymbolOutOfRange {
                symbol,
                alphabet: model.data_symbols,
            });
        }
        self.encode_symbol(symbol, model.last_symbol, &model.distribution)
    }

    /// Decode the next symbol with a static model.
    pub fn decode_static(&mut self, model: &StaticModel) -> Result<u32> {
        if self.mode != Mode::Decoding {
            return Err(Error::ModeMismatch);
        }
        let symbol = if model.decoder_table.is_empty() {
            self.decode_symbol_bisect(&model.distribution)
        } else {
            self.decode_symbol_table(
                &model.distribution,
                &model.decoder_table,
                model.table_shift,
                model.last_symbol,
            )
        };
        Ok(symbol)
    }

    /// Encode `symbol` with an adaptive model, updating its statistics.
    pub fn encode_adaptive(&mut self, symbol: u32, model: &mut AdaptiveModel) -> Result<()> {
        if self.mode != Mode::Encoding {
            return Err(Error::ModeMismatch);
        }
        if symbol >= model.data_symbols {
            return Err(Error::SymbolOutOfRange {
                symbol,
                alphabet: model.data_symbols,
            });
        }
        self.encode_symbol(symbol, model.last_symbol, &model.distribution)?;

        model.symbol_count[symbol as usize] += 1;
        model.symbols_until_update -= 1;
        if model.symbols_until_update == 0 {
            model.update(true);
        }
        Ok(())
    }

    /// Decode the next symbol with an adaptive model, updating its
    /// statistics exactly as the encoder did.
    pub fn decode_adaptive(&mut self, model: &mut AdaptiveModel) -> Result<u32> {
        if self.mode != Mode::Decoding {
            return Err(Error::ModeMismatch);
        }
        let symbol = if model.decoder_table.is_empty() {
            self.decode_symbol_bisect(&model.distribution)
        } else {
            self.decode_symbol_table(
                &model.distribution,
                &model.decoder_table,
                model.table_shift,
                model.last_symbol,
            )
        };

        model.symbol_count[symbol as usize] += 1;
        model.symbols_until_update -= 1;
        if model.symbols_until_update == 0 {
            model.update(false);
        }
        Ok(symbol)
    }

    /// Narrow the interval to the CDF slice of `symbol`.
    fn encode_symbol(&mut self, symbol: u32, last_symbol: u32, distribution: &[u32]) -> Result<()> {
        let init_base = self.base;
        if symbol == last_symbol {
            // upper edge abuts the interval top; the width needs no product
            let x = distribution[symbol as usize] * (self.length >> LENGTH_SHIFT);
            self.base = self.base.wrapping_add(x);
            self.length -= x;
        } else {
            self.length >>= LENGTH_SHIFT;
            let x = distribution[symbol as usize] * self.length;
            self.base = self.base.wrapping_add(x);
            self.length = distribution[symbol as usize + 1] * self.length - x;
        }
        if init_base > self.base {
            self.propagate_carry();
        }
        if self.length < MIN_LENGTH {
            self.renorm_enc_interval()?;
        }
        Ok(())
    }

    /// Inverse-CDF search with the lookup table bracketing a bisection.
    fn decode_symbol_table(
        &mut self,
        distribution: &[u32],
        decoder_table: &[u32],
        table_shift: u32,
        last_symbol: u32,
    ) -> u32 {
        let mut y = self.length;
        self.length >>= LENGTH_SHIFT;
        let dv = self.value / self.length;
        // clamp keeps a corrupted stream from indexing past the table;
        // valid streams always satisfy dv >> table_shift < table_size
        let t = ((dv >> table_shift) as usize).min(decoder_table.len() - 2);

        let mut s = decoder_table[t];
        let mut n = decoder_table[t + 1] + 1;
        while n > s + 1 {
            let m = (s + n) >> 1;
            if distribution[m as usize] > dv {
                n = m;
            } else {
                s = m;
            }
        }

        let x = distribution[s as usize] * self.length;
        if s != last_symbol {
            y = distribution[s as usize + 1] * self.length;
        }
        self.value -= x;
        self.length = y - x;
        if self.length < MIN_LENGTH {
            self.renorm_dec_interval();
        }
        s
    }

    /// Inverse-CDF search by plain bisection, for small alphabets.
    fn decode_symbol_bisect(&mut self, distribution: &[u32]) -> u32 {
        let mut y = self.length;
        let mut x = 0;
        let mut s = 0u32;
        self.length >>= LENGTH_SHIFT;
        let mut n = distribution.len() as u32;
        let mut m = n >> 1;
        loop {
            let z = self.length * distribution[m as usize];
            if z > self.value {
                n = m;
                y = z;
            } else {
                s = m;
                x = z;
            }
            m = (s + n) >> 1;
            if m == s {
                break;
            }
        }

        self.value -= x;
        self.length = y - x;
        if self.length < MIN_LENGTH {
            self.renorm_dec_interval();
        }
        s
    }

    /// Add one to the last emitted byte that can absorb it, zeroing the
    /// 0xFF run in between. The high-order bytes of any stream are below
    /// 0xFF, which bounds the walk.
    fn propagate_carry(&mut self) {
        let mut p = self.ac_pointer - 1;
        while self.buffer[p] == 0xFF {
            self.buffer[p] = 0;
            p -= 1;
        }
        self.buffer[p] += 1;
    }

    /// Emit settled high-order bytes until the interval is wide again.
    fn renorm_enc_interval(&mut self) -> Result<()> {
        loop {
            if self.ac_pointer >= self.buffer.len() {
                return Err(Error::BufferOverflow {
                    used: self.ac_pointer,
                    capacity: self.buffer_size,
                });
            }
            self.buffer[self.ac_pointer] = (self.base >> 24) as u8;
            self.ac_pointer += 1;
            self.base <<= 8;
            self.length <<= 8;
            if self.length >= MIN_LENGTH {
                return Ok(());
            }
        }
    }

    /// Shift the next stream bytes into the value window until the
    /// interval is wide again. Reads past the stream end see zeros; they
    /// can only occur after every encoded symbol is already determined.
    fn renorm_dec_interval(&mut self) {
        loop {
            self.ac_pointer += 1;
            let byte = self.buffer.get(self.ac_pointer).copied().unwrap_or(0);
            self.value = (self.value << 8) | u32::from(byte);
            self.length <<= 8;
            if self.length >= MIN_LENGTH {
                return;
            }
        }
    }
}

impl Default for ArithmeticCodec {
    fn default() -> Self {
        Self::new()
    }
}
