//! Disaggregation core for basin precipitation data.
//!
//! Four components, each depending on the previous:
//! 1. [`aggregate`] reduces raw sub-hourly gauge observations into per-hour
//!    totals per cell, flagging or zero-filling gaps.
//! 2. [`weights`] turns the aggregated history into normalized intra-block
//!    distribution triples, one candidate per climatological key per year.
//! 3. [`resolve`] maps a future block start onto the applicable key and its
//!    candidate years.
//! 4. [`disagg`] distributes each future 3-hour total into three hourly
//!    values using one randomly selected candidate, preserving the block
//!    total exactly and reproducibly under a fixed base seed.

pub mod aggregate;
pub mod config;
pub mod disagg;
pub mod resolve;
pub mod weights;
