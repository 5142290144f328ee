/*!
Scrape financial instrument identifiers, collect their daily closes, and forecast the next few closes with a
per-ticker LSTM written in Rust using PyTorch bindings.

Each asset class (stocks, agricultural, energy, FX and metal futures) runs through the same stages: discover names,
collect prices and filter the volatile ones, train one model per forecast horizon, then render and publish prediction
charts. The vendors, web pages and hosting involved all sit behind traits, so every stage can be driven offline.
*/
#![forbid(missing_docs)]

pub mod collect;
pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod instrument;
pub mod lstm;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod source;
pub mod util;
pub mod window;

pub use error::{Error, Result};

/// The floating point type to be used for CPU calculations
pub type CpuFloat = f64;

/// The floating point type to be used for GPU calculations
pub type GpuFloat = f32;
