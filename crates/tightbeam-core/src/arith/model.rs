//! Probability models for the arithmetic codec.
//!
//! A model partitions the real line into symbols by an ordered boundary
//! list and assigns each symbol a frequency. Two reserved symbols sit
//! below the value symbols: `EOF_SYMBOL` terminates a variable-length
//! sequence, `OUT_OF_RANGE_SYMBOL` stands in for values outside every
//! boundary (present only when given a nonzero frequency).
//!
//! # Invariants
//!
//! - Cumulative frequencies are strictly monotone per direction and total
//!   at most [`MAX_FREQUENCY`]; adaptation rescales before it would
//!   overflow.
//! - Encoder and decoder hold independent frequency state, updated only
//!   after a symbol is emitted or consumed, so both sides compute each
//!   interval from identical pre-update state.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::bitset::bits_to_represent;
use crate::error::RegistrationError;
use crate::registry::SymbolMapping;

/// Bits of range-coder precision.
pub const CODE_VALUE_BITS: u32 = 32;

/// Bits available to cumulative frequencies.
pub const FREQUENCY_BITS: u32 = 30;

/// Largest permitted cumulative frequency total.
pub const MAX_FREQUENCY: u64 = (1 << FREQUENCY_BITS) - 1;

/// Reserved symbol terminating a variable-length sequence.
pub const EOF_SYMBOL: i32 = -2;

/// Reserved symbol for values outside every boundary.
pub const OUT_OF_RANGE_SYMBOL: i32 = -1;

/// Smallest symbol value; reserved symbols sort below value symbols.
pub const MIN_SYMBOL: i32 = EOF_SYMBOL;

/// Which direction's adaptation state an operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// State advanced by encode.
    Encoder,
    /// State advanced by decode.
    Decoder,
}

/// Administrative description of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    /// Name fields reference through their `model` option.
    pub name: String,
    /// Ordered boundary values; one more entry than `frequencies`.
    /// Symbol `i` decodes back to `boundaries[i]`.
    pub boundaries: Vec<f64>,
    /// Initial frequency of each value symbol; all nonzero.
    pub frequencies: Vec<u64>,
    /// Frequency of [`EOF_SYMBOL`]; at least 1.
    pub eof_frequency: u64,
    /// Frequency of [`OUT_OF_RANGE_SYMBOL`]; 0 disables the symbol and
    /// makes out-of-range input an encode error.
    pub out_of_range_frequency: u64,
    /// Adapt frequencies as symbols are emitted/consumed.
    pub adaptive: bool,
}

impl ModelSpec {
    /// A static model with default EOF frequency 1 and no out-of-range
    /// symbol.
    pub fn new(
        name: impl Into<String>,
        boundaries: impl Into<Vec<f64>>,
        frequencies: impl Into<Vec<u64>>,
    ) -> Self {
        Self {
            name: name.into(),
            boundaries: boundaries.into(),
            frequencies: frequencies.into(),
            eof_frequency: 1,
            out_of_range_frequency: 0,
            adaptive: false,
        }
    }

    /// Enable adaptation.
    #[must_use]
    pub fn adaptive(mut self) -> Self {
        self.adaptive = true;
        self
    }

    /// Set the EOF symbol frequency.
    #[must_use]
    pub fn with_eof_frequency(mut self, frequency: u64) -> Self {
        self.eof_frequency = frequency;
        self
    }

    /// Give the out-of-range symbol a nonzero frequency, allowing values
    /// outside the boundaries to encode (they decode to NaN).
    #[must_use]
    pub fn with_out_of_range_frequency(mut self, frequency: u64) -> Self {
        self.out_of_range_frequency = frequency;
        self
    }

    fn validate(&self) -> Result<(), RegistrationError> {
        let fail = |reason: &str| RegistrationError::InvalidModel {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.frequencies.is_empty() {
            return Err(fail("at least one value symbol is required"));
        }
        if self.boundaries.len() != self.frequencies.len() + 1 {
            return Err(fail("boundaries must have exactly one more entry than frequencies"));
        }
        if self.boundaries.iter().any(|b| !b.is_finite()) {
            return Err(fail("boundaries must be finite"));
        }
        if self.boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(fail("boundaries must be strictly increasing"));
        }
        if self.frequencies.iter().any(|f| *f == 0) {
            return Err(fail("value symbol frequencies must be nonzero"));
        }
        if self.eof_frequency == 0 {
            return Err(fail("eof_frequency must be nonzero"));
        }
        let total: u64 = self.frequencies.iter().sum::<u64>()
            + self.eof_frequency
            + self.out_of_range_frequency;
        if total > MAX_FREQUENCY {
            return Err(fail("total frequency exceeds MAX_FREQUENCY"));
        }
        Ok(())
    }
}

/// One model plus its two per-direction adaptation states.
#[derive(Debug, Clone)]
pub(crate) struct Model {
    spec: ModelSpec,
    /// Symbols in cumulative order: EOF, out-of-range when enabled, then
    /// value symbols `0..n`.
    symbols: Vec<i32>,
    encoder: Vec<u64>,
    decoder: Vec<u64>,
}

impl Model {
    fn from_spec(spec: ModelSpec) -> Self {
        let mut symbols = vec![EOF_SYMBOL];
        let mut freqs = vec![spec.eof_frequency];
        if spec.out_of_range_frequency > 0 {
            symbols.push(OUT_OF_RANGE_SYMBOL);
            freqs.push(spec.out_of_range_frequency);
        }
        for (i, f) in spec.frequencies.iter().enumerate() {
            symbols.push(i as i32);
            freqs.push(*f);
        }
        Self { spec, symbols, encoder: freqs.clone(), decoder: freqs }
    }

    fn state(&self, direction: Direction) -> &[u64] {
        match direction {
            Direction::Encoder => &self.encoder,
            Direction::Decoder => &self.decoder,
        }
    }

    fn state_mut(&mut self, direction: Direction) -> &mut Vec<u64> {
        match direction {
            Direction::Encoder => &mut self.encoder,
            Direction::Decoder => &mut self.decoder,
        }
    }

    fn index_of(&self, symbol: i32) -> Option<usize> {
        self.symbols.iter().position(|s| *s == symbol)
    }

    /// Number of value symbols.
    pub(crate) fn num_value_symbols(&self) -> usize {
        self.spec.frequencies.len()
    }

    /// Current total frequency of one direction's state.
    pub(crate) fn total(&self, direction: Direction) -> u64 {
        self.state(direction).iter().sum()
    }

    /// Cumulative range `[c_lo, c_hi)` of a symbol, if it is present.
    pub(crate) fn range_of(&self, symbol: i32, direction: Direction) -> Option<(u64, u64)> {
        let idx = self.index_of(symbol)?;
        let state = self.state(direction);
        let c_lo: u64 = state[..idx].iter().sum();
        Some((c_lo, c_lo + state[idx]))
    }

    /// The symbol whose cumulative range contains `cum`.
    pub(crate) fn symbol_at(&self, cum: u64, direction: Direction) -> Option<i32> {
        let mut c_lo = 0u64;
        for (idx, f) in self.state(direction).iter().enumerate() {
            if cum < c_lo + f {
                return Some(self.symbols[idx]);
            }
            c_lo += f;
        }
        None
    }

    /// Map a raw value to a symbol under the group's mapping rule.
    pub(crate) fn value_to_symbol(&self, value: f64, mapping: SymbolMapping) -> i32 {
        let bounds = &self.spec.boundaries;
        let n = self.num_value_symbols();
        if !value.is_finite() || value < bounds[0] || value > bounds[n] {
            return OUT_OF_RANGE_SYMBOL;
        }

        let idx = match mapping {
            SymbolMapping::StrictBucket => {
                // First boundary above the value; the bucket below it.
                bounds.partition_point(|b| *b <= value).saturating_sub(1)
            },
            SymbolMapping::NearestNeighbor => {
                let upper = bounds.partition_point(|b| *b <= value);
                if upper >= bounds.len() {
                    n - 1
                } else {
                    let lower = upper.saturating_sub(1);
                    // The historic rule compares squared boundary values,
                    // not distances; reproduced for wire compatibility.
                    let lower_diff = (bounds[lower] * bounds[lower] - value * value).abs();
                    let upper_diff = (bounds[upper] * bounds[upper] - value * value).abs();
                    if lower_diff < upper_diff { lower } else { upper }
                }
            },
        };
        idx.min(n - 1) as i32
    }

    /// Map a symbol back to its value. `None` for EOF, NaN for
    /// out-of-range.
    pub(crate) fn symbol_to_value(&self, symbol: i32) -> Option<f64> {
        match symbol {
            EOF_SYMBOL => None,
            OUT_OF_RANGE_SYMBOL => Some(f64::NAN),
            s => self.spec.boundaries.get(s as usize).copied(),
        }
    }

    /// Adapt one direction's state after emitting/consuming `symbol`.
    ///
    /// A value symbol bumps its own frequency and every value symbol
    /// before it in the table; the reserved symbols bump only themselves.
    /// Rescales (halving, rounding up) before the update would push the
    /// total past [`MAX_FREQUENCY`].
    pub(crate) fn update(&mut self, symbol: i32, direction: Direction) {
        if !self.spec.adaptive {
            return;
        }

        let bumped: Vec<usize> = if symbol >= 0 {
            (0..=symbol)
                .filter_map(|s| self.index_of(s))
                .collect()
        } else {
            self.index_of(symbol).into_iter().collect()
        };

        let state = self.state_mut(direction);
        let total: u64 = state.iter().sum();
        if total + bumped.len() as u64 > MAX_FREQUENCY {
            for f in state.iter_mut() {
                *f = (*f + 1) / 2;
            }
        }
        for idx in bumped {
            self.state_mut(direction)[idx] += 1;
        }
    }

    /// Discard adaptation in both directions.
    pub(crate) fn reset(&mut self) {
        let fresh = Self::from_spec(self.spec.clone());
        self.encoder = fresh.encoder;
        self.decoder = fresh.decoder;
    }

    /// Current per-symbol frequencies of one direction, in cumulative
    /// order (EOF first).
    pub(crate) fn frequencies(&self, direction: Direction) -> Vec<(i32, u64)> {
        self.symbols.iter().copied().zip(self.state(direction).iter().copied()).collect()
    }

    /// Conservative upper bound in bits for encoding `ops` symbols
    /// (values plus any EOF) and flushing.
    ///
    /// An adaptive session can drive the total toward [`MAX_FREQUENCY`]
    /// while a rare symbol's own frequency stays put, so the static bound
    /// must assume the worst total, not the initial one.
    pub(crate) fn max_bits_bound(&self, ops: u64) -> u64 {
        let total = if self.spec.adaptive {
            MAX_FREQUENCY
        } else {
            self.spec.frequencies.iter().sum::<u64>()
                + self.spec.eof_frequency
                + self.spec.out_of_range_frequency
        };
        ops * u64::from(bits_to_represent(u128::from(total)) + 1) + 2
    }
}

/// Owner of every probability model, indexed by name.
///
/// Creation and reset are administrative; encode/decode reach the mutable
/// per-direction state through [`ModelManager::with_model`]. The interior
/// mutex serialises model access, not codec operations: a codec instance
/// is single-threaded per operation by contract.
#[derive(Default)]
pub struct ModelManager {
    models: Mutex<HashMap<String, Model>>,
}

impl ModelManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model from a validated spec.
    ///
    /// # Errors
    ///
    /// `RegistrationError::DuplicateModel` when the name is taken,
    /// `RegistrationError::InvalidModel` when the spec is inconsistent.
    pub fn create(&self, spec: ModelSpec) -> Result<(), RegistrationError> {
        spec.validate()?;
        let mut models = self.lock();
        if models.contains_key(&spec.name) {
            return Err(RegistrationError::DuplicateModel { name: spec.name });
        }
        models.insert(spec.name.clone(), Model::from_spec(spec));
        Ok(())
    }

    /// Drop adaptation state, restoring the initial frequencies in both
    /// directions. Call between independent sessions.
    pub fn reset(&self, name: &str) -> Result<(), RegistrationError> {
        let mut models = self.lock();
        let model = models
            .get_mut(name)
            .ok_or_else(|| RegistrationError::UnknownModel { name: name.to_string() })?;
        model.reset();
        Ok(())
    }

    /// True when a model with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Current per-symbol frequencies of one direction, reserved symbols
    /// first, for diagnostics and tests. `None` for unknown names.
    pub fn frequencies(&self, name: &str, direction: Direction) -> Option<Vec<(i32, u64)>> {
        self.lock().get(name).map(|model| model.frequencies(direction))
    }

    /// Run `f` with exclusive access to a model. `None` for unknown names.
    pub(crate) fn with_model<R>(&self, name: &str, f: impl FnOnce(&mut Model) -> R) -> Option<R> {
        let mut models = self.lock();
        models.get_mut(name).map(f)
    }

    /// Copy one direction's state of every model, for rollback.
    pub(crate) fn snapshot(&self, direction: Direction) -> Vec<(String, Vec<u64>)> {
        self.lock()
            .iter()
            .map(|(name, model)| (name.clone(), model.state(direction).to_vec()))
            .collect()
    }

    /// Restore a snapshot taken by [`ModelManager::snapshot`].
    pub(crate) fn restore(&self, direction: Direction, snapshot: Vec<(String, Vec<u64>)>) {
        let mut models = self.lock();
        for (name, state) in snapshot {
            if let Some(model) = models.get_mut(&name) {
                *model.state_mut(direction) = state;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Model>> {
        self.models.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("models", &self.lock().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_symbol_spec() -> ModelSpec {
        ModelSpec::new("m", vec![0.0, 1.0, 2.0, 3.0], vec![1, 1, 1])
    }

    #[test]
    fn spec_shape_is_checked() {
        let manager = ModelManager::new();
        let bad = ModelSpec::new("bad", vec![0.0, 1.0], vec![1, 1]);
        assert!(matches!(manager.create(bad), Err(RegistrationError::InvalidModel { .. })));

        let unsorted = ModelSpec::new("bad", vec![0.0, 2.0, 1.0, 3.0], vec![1, 1, 1]);
        assert!(matches!(manager.create(unsorted), Err(RegistrationError::InvalidModel { .. })));

        let zero_freq = ModelSpec::new("bad", vec![0.0, 1.0, 2.0, 3.0], vec![1, 0, 1]);
        assert!(matches!(manager.create(zero_freq), Err(RegistrationError::InvalidModel { .. })));

        manager.create(three_symbol_spec()).unwrap();
        assert!(matches!(
            manager.create(three_symbol_spec()),
            Err(RegistrationError::DuplicateModel { .. })
        ));
    }

    #[test]
    fn cumulative_ranges_stack_from_eof_up() {
        let model = Model::from_spec(three_symbol_spec());
        // Order: EOF (freq 1), then value symbols 0..3 at freq 1 each.
        assert_eq!(model.range_of(EOF_SYMBOL, Direction::Encoder), Some((0, 1)));
        assert_eq!(model.range_of(0, Direction::Encoder), Some((1, 2)));
        assert_eq!(model.range_of(2, Direction::Encoder), Some((3, 4)));
        assert_eq!(model.range_of(OUT_OF_RANGE_SYMBOL, Direction::Encoder), None);
        assert_eq!(model.total(Direction::Encoder), 4);
    }

    #[test]
    fn symbol_lookup_inverts_ranges() {
        let model = Model::from_spec(three_symbol_spec());
        assert_eq!(model.symbol_at(0, Direction::Decoder), Some(EOF_SYMBOL));
        assert_eq!(model.symbol_at(1, Direction::Decoder), Some(0));
        assert_eq!(model.symbol_at(3, Direction::Decoder), Some(2));
        assert_eq!(model.symbol_at(4, Direction::Decoder), None);
    }

    #[test]
    fn strict_bucket_mapping() {
        let model = Model::from_spec(three_symbol_spec());
        assert_eq!(model.value_to_symbol(0.0, SymbolMapping::StrictBucket), 0);
        assert_eq!(model.value_to_symbol(0.99, SymbolMapping::StrictBucket), 0);
        assert_eq!(model.value_to_symbol(1.0, SymbolMapping::StrictBucket), 1);
        assert_eq!(model.value_to_symbol(2.5, SymbolMapping::StrictBucket), 2);
        // The last boundary folds into the last bucket.
        assert_eq!(model.value_to_symbol(3.0, SymbolMapping::StrictBucket), 2);
        assert_eq!(model.value_to_symbol(3.1, SymbolMapping::StrictBucket), OUT_OF_RANGE_SYMBOL);
        assert_eq!(model.value_to_symbol(-0.1, SymbolMapping::StrictBucket), OUT_OF_RANGE_SYMBOL);
        assert_eq!(model.value_to_symbol(f64::NAN, SymbolMapping::StrictBucket), OUT_OF_RANGE_SYMBOL);
    }

    #[test]
    fn nearest_neighbor_mapping() {
        let model = Model::from_spec(three_symbol_spec());
        assert_eq!(model.value_to_symbol(0.1, SymbolMapping::NearestNeighbor), 0);
        // 1.9² is closer to 2² than to 1².
        assert_eq!(model.value_to_symbol(1.9, SymbolMapping::NearestNeighbor), 2);
        assert_eq!(model.value_to_symbol(1.1, SymbolMapping::NearestNeighbor), 1);
        // Boundary index 3 exists but has no symbol; clamped to the last.
        assert_eq!(model.value_to_symbol(3.0, SymbolMapping::NearestNeighbor), 2);
    }

    #[test]
    fn eof_has_no_value() {
        let model = Model::from_spec(three_symbol_spec());
        assert_eq!(model.symbol_to_value(EOF_SYMBOL), None);
        assert_eq!(model.symbol_to_value(1), Some(1.0));
        assert!(
            model
                .symbol_to_value(OUT_OF_RANGE_SYMBOL)
                .is_some_and(f64::is_nan)
        );
    }

    #[test]
    fn adaptation_bumps_the_symbol_and_everything_before_it() {
        let mut model = Model::from_spec(three_symbol_spec().adaptive());
        for symbol in [0, 0, 1] {
            model.update(symbol, Direction::Encoder);
        }
        let freqs: Vec<u64> = model
            .frequencies(Direction::Encoder)
            .into_iter()
            .filter(|(s, _)| *s >= 0)
            .map(|(_, f)| f)
            .collect();
        assert_eq!(freqs, vec![4, 2, 1]);

        // Decoder state is independent until it consumes the same symbols.
        assert_eq!(model.total(Direction::Decoder), 4);
    }

    #[test]
    fn non_adaptive_models_never_move() {
        let mut model = Model::from_spec(three_symbol_spec());
        model.update(2, Direction::Encoder);
        assert_eq!(model.total(Direction::Encoder), 4);
    }

    #[test]
    fn reset_restores_initial_frequencies() {
        let manager = ModelManager::new();
        manager.create(three_symbol_spec().adaptive()).unwrap();
        manager
            .with_model("m", |m| {
                m.update(2, Direction::Encoder);
                m.update(2, Direction::Decoder);
            })
            .unwrap();
        manager.reset("m").unwrap();
        let totals = manager
            .with_model("m", |m| (m.total(Direction::Encoder), m.total(Direction::Decoder)))
            .unwrap();
        assert_eq!(totals, (4, 4));

        assert!(matches!(
            manager.reset("missing"),
            Err(RegistrationError::UnknownModel { .. })
        ));
    }

    #[test]
    fn rescale_keeps_totals_bounded() {
        let spec = ModelSpec::new("big", vec![0.0, 1.0, 2.0], vec![MAX_FREQUENCY - 2, 1]).adaptive();
        let mut model = Model::from_spec(spec);
        // total == MAX_FREQUENCY; the next update must rescale first.
        model.update(1, Direction::Encoder);
        assert!(model.total(Direction::Encoder) <= MAX_FREQUENCY);
        let state: Vec<u64> =
            model.frequencies(Direction::Encoder).into_iter().map(|(_, f)| f).collect();
        assert!(state.iter().all(|f| *f >= 1), "rescale rounds up, never to zero");
    }

    #[test]
    fn snapshot_restore_round_trips() {
        let manager = ModelManager::new();
        manager.create(three_symbol_spec().adaptive()).unwrap();
        let snap = manager.snapshot(Direction::Encoder);
        manager.with_model("m", |m| m.update(2, Direction::Encoder)).unwrap();
        assert_ne!(manager.snapshot(Direction::Encoder), snap);
        manager.restore(Direction::Encoder, snap.clone());
        assert_eq!(manager.snapshot(Direction::Encoder), snap);
    }
}
