// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Anomalies reported by the checkers.
//!
//! The `Display` implementations produce the report lines printed by
//! `memtrace-check`.

use std::fmt;

use crate::classify::{EventId, RequestKey};

/// A single reported anomaly.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Finding {
    /// A response whose request was never seen (or was already answered).
    MissingRequest {
        /// Key the response was addressed to.
        key: RequestKey,
        /// Line of the response.
        line: usize,
    },

    /// A request still waiting for a response at the end of the log.
    IncompleteRequest {
        /// Key of the request.
        key: RequestKey,
        /// Line of the request.
        line: usize,
    },

    /// A load returned something other than the last value stored.
    ValueMismatch {
        /// Identifier of the read request.
        id: EventId,
        /// Address loaded.
        address: String,
        /// Value returned by the load.
        observed: String,
        /// Value of the most recent store to the same address.
        expected: String,
        /// Line of the load response.
        line: usize,
    },
}

impl Finding {
    /// Line in the log the finding refers to.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Finding::MissingRequest { line, .. }
            | Finding::IncompleteRequest { line, .. }
            | Finding::ValueMismatch { line, .. } => *line,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Finding::MissingRequest { key, .. } => {
                write!(f, "Found response for missing request: {key}")
            }
            Finding::IncompleteRequest { key, .. } => write!(f, "Incomplete request:   {key}"),
            Finding::ValueMismatch {
                id,
                address,
                observed,
                expected,
                ..
            } => write!(
                f,
                "Read {id} of address {address} has value {observed}. Does not match old value of {expected}."
            ),
        }
    }
}

/// Totals reported by the value checker.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ValueSummary {
    /// Number of store responses seen.
    pub stores: usize,
    /// Number of loads from an address that had previously been stored to.
    pub matched_loads: usize,
    /// Number of load responses seen.
    pub total_loads: usize,
}

impl fmt::Display for ValueSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Checked {} stores, matched {} loads ({} total)",
            self.stores, self.matched_loads, self.total_loads
        )
    }
}

/// Totals reported by the reconciler.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ReconcileSummary {
    /// Number of request lines seen.
    pub requests: usize,
    /// Number of response lines seen.
    pub responses: usize,
    /// Number of responses that found their request.
    pub matched: usize,
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Matched {} responses to {} requests ({} responses total)",
            self.matched, self.requests, self.responses
        )
    }
}
