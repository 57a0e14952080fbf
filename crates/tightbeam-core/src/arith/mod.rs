//! Adaptive arithmetic field codec.
//!
//! A range coder over per-field probability models. Fields that cluster
//! around a few likely values (battery voltage, status codes, quantised
//! headings) encode in a fraction of the bits a uniform-range codec
//! spends, at the cost of both peers agreeing on the model (and, for
//! adaptive models, on the exact sequence of messages).
//!
//! Models are administered through [`ModelManager`]
//! (create/reset) and referenced from fields by name via the `model`
//! option. Encoder and decoder adaptation state are kept separately per
//! model so the "update after emit/consume" order stays symmetric.

mod codec;
mod coder;
mod model;

pub use model::{
    CODE_VALUE_BITS, Direction, EOF_SYMBOL, FREQUENCY_BITS, MAX_FREQUENCY, MIN_SYMBOL,
    ModelManager, ModelSpec, OUT_OF_RANGE_SYMBOL,
};

pub(crate) use codec::ArithmeticCodec;
