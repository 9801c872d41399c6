//! Probability models driving the codec.
//!
//! Both flavors present the same shape to the codec: a cumulative
//! distribution scaled to `1 << LENGTH_SHIFT`, and, for alphabets larger
//! than 16 symbols, a lookup table that brackets the inverse-CDF search so
//! decoding needs only a short bisection.

use crate::error::{Error, Result};

/// Bits of CDF resolution; probabilities are scaled to `1 << 15`.
pub const LENGTH_SHIFT: u32 = 15;

/// Ceiling on the adaptive total count; counts are halved once the running
/// total passes it, so no interval ever collapses to zero width.
pub const MAX_COUNT: u32 = 1 << LENGTH_SHIFT;

/// Largest supported alphabet.
pub const MAX_ALPHABET: u32 = 1 << 11;

/// Alphabets up to this size decode by plain bisection, with no table.
const NO_TABLE_LIMIT: u32 = 16;

fn validate_alphabet(data_symbols: u32) -> Result<()> {
    if data_symbols < 2 || data_symbols > MAX_ALPHABET {
        return Err(Error::InvalidAlphabetSize(data_symbols));
    }
    Ok(())
}

/// Lookup geometry `(table_size, table_shift)` for an alphabet, or `(0, 0)`
/// when it is small enough to skip the table.
fn table_geometry(data_symbols: u32) -> (u32, u32) {
    if data_symbols <= NO_TABLE_LIMIT {
        return (0, 0);
    }
    let mut table_bits = 3;
    while data_symbols > (1 << (table_bits + 2)) {
        table_bits += 1;
    }
    (1 << table_bits, LENGTH_SHIFT - table_bits)
}

/// Fixed distribution over an alphabet, set once and never updated by the
/// codec.
pub struct StaticModel {
    pub(crate) distribution: Vec<u32>,
    pub(crate) decoder_table: Vec<u32>,
    pub(crate) data_symbols: u32,
    pub(crate) last_symbol: u32,
    pub(crate) table_shift: u32,
    table_size: u32,
}

impl StaticModel {
    /// Create a model over `data_symbols` symbols.
    ///
    /// `probability` holds one weight in `[0, 1]` per symbol and must sum
    /// to 1 within a small tolerance. Pass `None` for a uniform
    /// distribution.
    pub fn new(data_symbols: u32, probability: Option<&[f32]>) -> Result<Self> {
        let mut model = Self {
            distribution: Vec::new(),
            decoder_table: Vec::new(),
            data_symbols: 0,
            last_symbol: 0,
            table_shift: 0,
            table_size: 0,
        };
        model.set_distribution(data_symbols, probability)?;
        Ok(model)
    }

    /// Replace the distribution, resizing the alphabet when it changes.
    ///
    /// If the probabilities are rejected the model contents are
    /// unspecified; set a valid distribution before coding with it.
    pub fn set_distribution(
        &mut self,
        data_symbols: u32,
        probability: Option<&[f32]>,
    ) -> Result<()> {
        validate_alphabet(data_symbols)?;
        if let Some(p) = probability {
            if p.len() != data_symbols as usize {
                return Err(Error::DistributionLength {
                    expected: data_symbols,
                    got: p.len(),
                });
            }
            if let Some(&bad) = p.iter().find(|q| !(0.0..=1.0).contains(*q)) {
                return Err(Error::InvalidProbability(bad));
            }
        }

        if self.data_symbols != data_symbols {
            self.data_symbols = data_symbols;
            self.last_symbol = data_symbols - 1;
            let (table_size, table_shift) = table_geometry(data_symbols);
            self.table_size = table_size;
            self.table_shift = table_shift;
            self.distribution = vec![0; data_symbols as usize];
            self.decoder_table = if table_size == 0 {
                Vec::new()
            } else {
                vec![0; table_size as usize + 2]
            };
        }

        let uniform = 1.0f32 / data_symbols as f32;
        let mut sum = 0.0f32;
        let mut s = 0usize;
        for k in 0..self.data_symbols as usize {
            let p = probability.map_or(uniform, |p| p[k]);
            self.distribution[k] = (sum * (1u32 << LENGTH_SHIFT) as f32) as u32;
            sum += p;
            if self.table_size != 0 {
                let w = (self.distribution[k] >> self.table_shift) as usize;
                while s < w {
                    s += 1;
                    self.decoder_table[s] = k as u32 - 1;
                }
            }
        }
        if self.table_size != 0 {
            self.decoder_table[0] = 0;
            while s <= self.table_size as usize {
                s += 1;
                self.decoder_table[s] = self.last_symbol;
            }
        }

        if !(0.9999..=1.001).contains(&sum) {
            return Err(Error::InvalidProbabilitySum(sum));
        }
        Ok(())
    }

    /// Alphabet size.
    pub fn symbols(&self) -> u32 {
        self.data_symbols
    }
}

/// Distribution learned online from the coded symbols.
///
/// Per-symbol counts start uniform at one and grow as symbols are coded.
/// The cumulative table is rebuilt on a geometrically growing cycle
/// (roughly x1.25 per rebuild, capped) so rebuild cost amortizes while the
/// estimate still tracks drift in the source.
pub struct AdaptiveModel {
    pub(crate) distribution: Vec<u32>,
    pub(crate) symbol_count: Vec<u32>,
    pub(crate) decoder_table: Vec<u32>,
    pub(crate) total_count: u32,
    pub(crate) update_cycle: u32,
    pub(crate) symbols_until_update: u32,
    pub(crate) data_symbols: u32,
    pub(crate) last_symbol: u32,
    pub(crate) table_shift: u32,
    table_size: u32,
}

impl AdaptiveModel {
    /// Create a model over `data_symbols` symbols with uniform statistics.
    pub fn new(data_symbols: u32) -> Result<Self> {
        let mut model = Self {
            distribution: Vec::new(),
            symbol_count: Vec::new(),
            decoder_table: Vec::new(),
            total_count: 0,
            update_cycle: 0,
            symbols_until_update: 0,
            data_symbols: 0,
            last_symbol: 0,
            table_shift: 0,
            table_size: 0,
        };
        model.set_alphabet(data_symbols)?;
        Ok(model)
    }

    /// Change the alphabet size. Statistics are reset either way.
    pub fn set_alphabet(&mut self, data_symbols: u32) -> Result<()> {
        validate_alphabet(data_symbols)?;
        if self.data_symbols != data_symbols {
            self.data_symbols = data_symbols;
            self.last_symbol = data_symbols - 1;
            let (table_size, table_shift) = table_geometry(data_symbols);
            self.table_size = table_size;
            self.table_shift = table_shift;
            self.distribution = vec![0; data_symbols as usize];
            self.symbol_count = vec![0; data_symbols as usize];
            self.decoder_table = if table_size == 0 {
                Vec::new()
            } else {
                vec![0; table_size as usize + 2]
            };
        }
        self.reset();
        Ok(())
    }

    /// Restore uniform statistics, as for a freshly created model.
    ///
    /// Encoder and decoder must agree on the model state; reset both sides
    /// (or neither) between sessions.
    pub fn reset(&mut self) {
        self.total_count = 0;
        self.update_cycle = self.data_symbols;
        self.symbol_count.fill(1);
        self.update(false);
        self.update_cycle = (self.data_symbols + 6) >> 1;
        self.symbols_until_update = self.update_cycle;
    }

    /// How many times `symbol` has been coded since the last reset, plus
    /// the initial one.
    pub fn symbol_count(&self, symbol: u32) -> u32 {
        self.symbol_count[symbol as usize]
    }

    /// Alphabet size.
    pub fn symbols(&self) -> u32 {
        self.data_symbols
    }

    /// Rebuild the cumulative distribution from the counts; the decoder
    /// table is only rebuilt on the decode path, where it is consulted.
    pub(crate) fn update(&mut self, from_encoder: bool) {
        self.total_count += self.update_cycle;
        if self.total_count > MAX_COUNT {
            self.total_count = 0;
            for count in &mut self.symbol_count {
                // round-up halving keeps every count >= 1
                *count = (*count + 1) >> 1;
                self.total_count += *count;
            }
        }

        let scale = 0x8000_0000u32 / self.total_count;
        let mut sum = 0u32;
        let mut s = 0usize;
        if from_encoder || self.table_size == 0 {
            for k in 0..self.data_symbols as usize {
                self.distribution[k] = (scale * sum) >> (31 - LENGTH_SHIFT);
                sum += self.symbol_count[k];
            }
        } else {
            for k in 0..self.data_symbols as usize {
                self.distribution[k] = (scale * sum) >> (31 - LENGTH_SHIFT);
                sum += self.symbol_count[k];
                let w = (self.distribution[k] >> self.table_shift) as usize;
                while s < w {
                    s += 1;
                    self.decoder_table[s] = k as u32 - 1;
                }
            }
            self.decoder_table[0] = 0;
            while s <= self.table_size as usize {
                s += 1;
                self.decoder_table[s] = self.last_symbol;
            }
        }

        self.update_cycle = ((5 * self.update_cycle) >> 2).min((self.data_symbols + 6) << 3);
        self.symbols_until_update = self.update_cycle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_cdf_invariants(distribution: &[u32]) {
        assert_eq!(distribution[0], 0);
        for pair in distribution.windows(2) {
            assert!(pair[0] <= pair[1], "cdf must be non-decreasing");
        }
        assert!(*distribution.last().unwrap() < 1 << LENGTH_SHIFT);
    }

    /// Last symbol whose cdf does not exceed `dv`: what the inverse search
    /// must find.
    fn inverse_cdf(distribution: &[u32], dv: u32) -> u32 {
        let mut symbol = 0;
        for (k, &d) in distribution.iter().enumerate() {
            if d <= dv {
                symbol = k as u32;
            } else {
                break;
            }
        }
        symbol
    }

    /// Every table bucket must bracket the symbols of its `dv` range.
    fn assert_table_brackets(distribution: &[u32], table: &[u32], table_shift: u32) {
        let table_size = table.len() - 2;
        for t in 0..table_size {
            let first_dv = (t as u32) << table_shift;
            let last_dv = ((t as u32 + 1) << table_shift) - 1;
            assert!(table[t] <= inverse_cdf(distribution, first_dv));
            assert!(inverse_cdf(distribution, last_dv) <= table[t + 1]);
        }
    }

    /// Account coded symbols the way the codec does, rebuilding on cycle
    /// exhaustion.
    fn code_symbols(model: &mut AdaptiveModel, symbol: u32, count: u32, from_encoder: bool) {
        for _ in 0..count {
            model.symbol_count[symbol as usize] += 1;
            model.symbols_until_update -= 1;
            if model.symbols_until_update == 0 {
                model.update(from_encoder);
            }
        }
    }

    #[test]
    fn static_uniform_distribution() {
        let model = StaticModel::new(4, None).unwrap();
        assert_eq!(model.distribution, vec![0, 8192, 16384, 24576]);
        assert_eq!(model.last_symbol, 3);
        assert!(model.decoder_table.is_empty());
    }

    #[test]
    fn static_rejects_bad_alphabet() {
        assert!(matches!(
            StaticModel::new(1, None),
            Err(Error::InvalidAlphabetSize(1))
        ));
        assert!(matches!(
            StaticModel::new(2049, None),
            Err(Error::InvalidAlphabetSize(2049))
        ));
    }

    #[test]
    fn static_rejects_bad_probabilities() {
        assert!(matches!(
            StaticModel::new(2, Some(&[0.5, 1.5])),
            Err(Error::InvalidProbability(_))
        ));
        assert!(matches!(
            StaticModel::new(2, Some(&[0.5, -0.1])),
            Err(Error::InvalidProbability(_))
        ));
        assert!(matches!(
            StaticModel::new(3, Some(&[0.5, 0.5])),
            Err(Error::DistributionLength { expected: 3, got: 2 })
        ));
        assert!(matches!(
            StaticModel::new(2, Some(&[0.3, 0.3])),
            Err(Error::InvalidProbabilitySum(_))
        ));
    }

    #[test]
    fn static_table_geometry() {
        // 17 symbols is the smallest alphabet that gets a table
        let model = StaticModel::new(17, None).unwrap();
        assert_eq!(model.table_size, 8);
        assert_eq!(model.table_shift, 12);
        assert_eq!(model.decoder_table.len(), 10);

        let model = StaticModel::new(2048, None).unwrap();
        assert_eq!(model.table_size, 512);
        assert_eq!(model.table_shift, 6);
    }

    #[test]
    fn static_table_brackets_cdf() {
        let model = StaticModel::new(256, None).unwrap();
        assert_cdf_invariants(&model.distribution);
        assert_table_brackets(&model.distribution, &model.decoder_table, model.table_shift);
    }

    #[test]
    fn adaptive_reset_is_uniform() {
        let mut model = AdaptiveModel::new(16).unwrap();
        for s in 0..16 {
            assert_eq!(model.symbol_count(s), 1);
        }
        assert_eq!(model.update_cycle, (16 + 6) >> 1);
        assert_eq!(model.symbols_until_update, model.update_cycle);
        assert_cdf_invariants(&model.distribution);

        code_symbols(&mut model, 3, 40, false);
        assert!(model.symbol_count(3) > 1);
        model.reset();
        assert_eq!(model.symbol_count(3), 1);
        assert_cdf_invariants(&model.distribution);
    }

    #[test]
    fn adaptive_rebuild_keeps_invariants() {
        let mut model = AdaptiveModel::new(256).unwrap();
        // skew hard toward one symbol across several rescale cycles
        for _ in 0..200 {
            let burst = model.symbols_until_update;
            code_symbols(&mut model, 7, burst, false);
            assert_cdf_invariants(&model.distribution);
            assert!(model.symbol_count.iter().all(|&c| c >= 1));
            assert!(model.total_count <= MAX_COUNT);
            assert_eq!(model.total_count, model.symbol_count.iter().sum::<u32>());
            assert_table_brackets(&model.distribution, &model.decoder_table, model.table_shift);
        }
    }

    #[test]
    fn adaptive_cycle_grows_and_caps() {
        let mut model = AdaptiveModel::new(16).unwrap();
        let cap = (16 + 6) << 3;
        let mut previous = model.update_cycle;
        for _ in 0..40 {
            model.update(true);
            assert!(model.update_cycle >= previous);
            assert!(model.update_cycle <= cap);
            previous = model.update_cycle;
        }
        assert_eq!(model.update_cycle, cap);
    }

    #[test]
    fn adaptive_set_alphabet_reallocates() {
        let mut model = AdaptiveModel::new(16).unwrap();
        assert!(model.decoder_table.is_empty());
        model.set_alphabet(64).unwrap();
        assert_eq!(model.symbols(), 64);
        assert_eq!(model.symbol_count.len(), 64);
        assert!(!model.decoder_table.is_empty());
        assert!(matches!(
            model.set_alphabet(0),
            Err(Error::InvalidAlphabetSize(0))
        ));
    }
}
