//! # Filter Module
//!
//! Query-string filter expressions over resource collections.
//!
//! ## Grammar
//!
//! `field[__segment...][__terminator][__not]=v1,v2,...`
//!
//! The leading segment must name a filterable field of the resource; an
//! unknown or unfilterable name is a `BadRequest`. A trailing `not` inverts
//! the whole per-parameter condition. A trailing known terminator names the
//! comparison; anything else defaults to exact match.
//!
//! ## Combination
//!
//! Distinct query parameters combine with logical AND; comma-separated
//! values of one parameter combine with logical OR. Inversion negates the
//! combined per-parameter condition, not the individual value tests
//! (`id__not=1,2` keeps items whose id is neither 1 nor 2).

mod core;

pub use self::core::{apply, parse, FilterSpec, Terminator};
