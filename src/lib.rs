//! # Arithmetic Coding
//!
//! *Entropy coding at the Shannon limit, one byte of output at a time.*
//!
//! ## Intuition First
//!
//! Think of the message as picking out a single point on a number line
//! between 0 and 1. Each symbol narrows the surviving interval to the slice
//! that symbol's probability occupies: likely symbols shave off little
//! (costing few bits), unlikely symbols shave off a lot (costing many).
//! When encoding ends, *any* number inside the final interval identifies
//! the whole message, and writing one such number takes about
//! $-\log_2 p$ bits per symbol — the entropy.
//!
//! ## The Problem
//!
//! Prefix codes must spend a whole number of bits per symbol, which wastes
//! up to a bit each time and cannot exploit probabilities above one half.
//! Arithmetic coding spends *fractional* bits, but a naive rendition needs
//! unbounded-precision arithmetic. The classic fix is to keep only a 32-bit
//! window `[base, base + length)` of the interval, emit a byte whenever the
//! top 8 bits have settled, and patch already-emitted bytes when a carry
//! ripples out of the window.
//!
//! ## Historical Context
//!
//! ```text
//! 1948  Shannon        Entropy as the fundamental limit
//! 1963  Elias          Recursive interval subdivision (unpublished)
//! 1976  Rissanen/Pasco Finite-precision arithmetic coding
//! 1987  Witten et al.  The CACM implementation everyone copied
//! 1998  Moffat et al.  Restructured coder, fewer multiplications
//! 2004  Said           FastAC: byte renormalization, table lookups
//! ```
//!
//! ## Mathematical Formulation
//!
//! With cumulative probabilities $F(s) = \sum_{k<s} p_k$ scaled to
//! $2^{15}$, coding symbol $s$ maps the interval by
//!
//! ```text
//! base   += F(s)   * (length >> 15)
//! length  = F(s+1) * (length >> 15) - F(s) * (length >> 15)
//! ```
//!
//! and renormalizes (`base <<= 8`, `length <<= 8`, emit one byte) while
//! `length < 2^24`. Decoding divides the 32-bit stream window by
//! `length >> 15` and inverts $F$ to recover $s$.
//!
//! ## Complexity Analysis
//!
//! - **Time**: $O(\log N)$ per symbol from the inverse-CDF bisection;
//!   the lookup table in large-alphabet models cuts the bisection to a
//!   few steps. Renormalization is $O(1)$ amortized.
//! - **Space**: $O(N)$ per model plus the compressed buffer.
//!
//! ## Failure Modes
//!
//! 1. **Model divergence**: encoder and decoder must walk identical model
//!    states; resetting one side but not the other garbles the stream.
//! 2. **Zero-width slices**: a static symbol given probability 0 encodes
//!    to an undecodable stream. Adaptive counts are floored at 1, so only
//!    hand-built static models can hit this.
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - [`ArithmeticCodec`]: the interval machine, with raw bit I/O as a
//!   bypass for incompressible fields.
//! - [`StaticModel`]: fixed distribution, optional decode lookup table.
//! - [`AdaptiveModel`]: online-learned distribution with periodic
//!   rescaling.
//!
//! The stream format has no framing, header, or checksum; it is an opaque
//! byte sequence whose length `stop_encoder` reports. Identical inputs and
//! model state produce byte-identical streams on every platform.
//!
//! ## References
//!
//! - Witten, I., Neal, R., Cleary, J. (1987). "Arithmetic coding for data
//!   compression."
//! - Moffat, A., Neal, R., Witten, I. (1998). "Arithmetic coding
//!   revisited."
//! - Said, A. (2004). "Introducing efficient arithmetic coding
//!   implementations, with measurements and comparisons."

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod model;

pub use codec::ArithmeticCodec;
pub use error::Error;
pub use model::{AdaptiveModel, StaticModel};
