// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Post-hoc checks over the textual debug log of a memory-hierarchy
//! simulation.
//!
//! Caches in the simulator print a line when they accept a CPU request, when
//! they build the response to the CPU, and when a write response from further
//! down the hierarchy is matched to its original write. This crate classifies
//! those lines and feeds them to two checkers:
//!
//!   - the [`Reconciler`](crate::reconcile::Reconciler) pairs every response
//!     with its request and reports the leftovers on both sides.
//!   - the [`ValueChecker`](crate::values::ValueChecker) remembers the last
//!     value stored to each address and reports loads that disagree with it.
//!
//! Both run in a single sequential pass driven by
//! [`process_log`](crate::scan::process_log).
//!
//! # Example
//!
//! ```
//! use memtrace::classify::Classifier;
//! use memtrace::reconcile::Reconciler;
//! use memtrace::scan::process_log;
//!
//! let log = "\
//! 10:Cache::handleCPURequest():465 l1cache: (5, 0) 0x1000 READ MISS (block 0x1000 [-1])
//! 20:Cache::makeCPUResponse():592 l1cache: Creating Response to CPU: (9, 0) in Response To (5, 0)
//! 30:Cache::handleCPURequest():465 l1cache: (6, 0) 0x1040 WRITE MISS (block 0x1040 [-1])
//! ";
//!
//! let mut reconciler = Reconciler::default();
//! process_log(log.as_bytes(), &Classifier::new(), &mut reconciler).unwrap();
//!
//! let findings = reconciler.finalize();
//! assert_eq!(findings.len(), 1);
//! assert_eq!(findings[0].to_string(), "Incomplete request:   l1cache (6, 0)");
//! ```

// Enable warnings for missing documentation
#![warn(missing_docs)]

pub mod classify;
pub mod error;
pub mod finding;
pub mod reconcile;
pub mod scan;
pub mod values;

pub use classify::{Access, Classifier, Command, EventId, LogLine, RequestKey};
pub use error::ScanError;
pub use finding::Finding;
pub use scan::{CheckMode, LineVisitor, ScanReport, process_log, scan_file};
