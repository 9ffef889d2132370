//! # Stream publishers.
//!
//! [`Flux`] is the single publisher type; its variants live in sibling
//! modules and share the same per-subscription building blocks
//! (`DemandState`, `Serializer`) from `signals`.
//!
//! ## Sources and operators
//! | Module     | Provides                                 |
//! |------------|------------------------------------------|
//! | `indexed`  | `just`, `empty`, `range`                 |
//! | `interval` | `interval` (scheduler driven)            |
//! | `failed`   | `error`                                  |
//! | `map`      | `map`, `try_map`                         |
//! | `zip`      | `zip`, `zip_with`, `zip_with_prefetch`   |
//! | `manual`   | [`ManualPublisher`]                      |

mod failed;
mod flux;
mod indexed;
mod interval;
mod manual;
mod map;
mod zip;

pub use flux::{Flux, Value};
pub use manual::ManualPublisher;
pub use zip::DEFAULT_PREFETCH;
