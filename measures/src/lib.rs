//! A fire-and-forget client for reporting counters and timings to a collector over UDP.
//!
//! Each measure is a JSON object made of caller-supplied [`Dimensions`] plus a few reserved fields, sent as a single
//! UDP datagram. There is no batching, no aggregation, and no acknowledgement: a lost datagram is simply lost.
//!
//! # Usage
//!
//! ```no_run
//! # use std::time::Instant;
//! # use measures::{dimensions, Reporter};
//! let mut reporter = Reporter::new("bookstore", "127.0.0.1:3593");
//!
//! // Sends `{"L":10,"M":5,"XL":20,"client":"bookstore","count":3,"metric":"sizes"}`.
//! let sizes = dimensions! { "XL" => 20, "L" => 10, "M" => 5 };
//! reporter.count("sizes", 3, &sizes).expect("failed to report count");
//!
//! // Sends the elapsed time, in seconds, under the `time` key.
//! let start = Instant::now();
//! // ... do some work ...
//! reporter.time("checkout", start, &dimensions! { "items" => 2 }).expect("failed to report time");
//!
//! reporter.clean_up();
//! ```
//!
//! Errors are returned to the caller, who is free to ignore them.
//!
//! # Payloads
//!
//! Keys are always written in lexicographic order, at every nesting level, so a given set of dimensions always
//! produces the same bytes. Every payload contains:
//!
//! - `client`: the client name given to the [`Reporter`]
//! - `metric`: the metric name given to [`Reporter::count`] or [`Reporter::time`]
//! - `count` or `time`: the counter value, or the elapsed time in fractional seconds
//!
//! These reserved fields always overwrite dimensions with the same key.
//!
//! # Transport
//!
//! [`UdpClient`] connects lazily on first write. When a write fails, it reconnects and retries exactly once, which
//! covers a collector restart invalidating the socket. Any other [`Client`] implementation can be swapped in with
//! [`Reporter::set_client`]; [`debugging::DebuggingClient`] captures payloads in memory for tests.
//!
//! # `metrics` integration
//!
//! [`MeasuresRecorder`] implements [`metrics::Recorder`], turning counter updates into counts and histogram samples
//! into times. It can be built and installed through [`ReporterBuilder`].
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, ReporterBuilder};

mod client;
pub use self::client::{Client, UdpClient};

pub mod debugging;

mod dimensions;
pub use self::dimensions::{Dimensions, Value};

mod error;
pub use self::error::Error;

mod recorder;
pub use self::recorder::MeasuresRecorder;

mod reporter;
pub use self::reporter::Reporter;
