// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Check that loads observe the last value stored.
//!
//! Stores update a table of address to value, loads are compared against it.
//! A load from an address that has not been stored to yet cannot be checked
//! and only counts towards the total.

use std::collections::HashMap;

use log::{debug, info};

use crate::classify::{Access, Command, EventId, RequestKey};
use crate::finding::{Finding, ValueSummary};
use crate::scan::LineVisitor;

/// Tracks the last value written to each address.
#[derive(Debug, Default)]
pub struct ValueChecker {
    values: HashMap<String, String>,
    findings: Vec<Finding>,
    summary: ValueSummary,
}

impl ValueChecker {
    /// Record a store.
    pub fn on_write(&mut self, address: &str, value: &str) {
        self.summary.stores += 1;
        self.values.insert(address.to_string(), value.to_string());
    }

    /// Check a load against the last store to the same address.
    pub fn on_read(&mut self, id: EventId, address: &str, value: &str, line: usize) {
        self.summary.total_loads += 1;

        let Some(expected) = self.values.get(address) else {
            debug!("{line}: read {id} of {address} before any write");
            return;
        };

        self.summary.matched_loads += 1;
        if expected != value {
            let finding = Finding::ValueMismatch {
                id,
                address: address.to_string(),
                observed: value.to_string(),
                expected: expected.clone(),
                line,
            };
            debug!("{line}: {finding}");
            self.findings.push(finding);
        }
    }

    /// Mismatches found so far.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Totals seen so far.
    #[must_use]
    pub fn summary(&self) -> ValueSummary {
        self.summary
    }

    /// Consume the checker returning the mismatches and the totals.
    #[must_use]
    pub fn finalize(self) -> (Vec<Finding>, ValueSummary) {
        info!("{}", self.summary);
        (self.findings, self.summary)
    }
}

impl LineVisitor for ValueChecker {
    fn cpu_response(&mut self, line: usize, key: &RequestKey, access: Option<&Access>) {
        let Some(access) = access else {
            return;
        };

        match access.command {
            Command::Write => self.on_write(&access.address, &access.value),
            Command::Read => self.on_read(key.id, &access.address, &access.value, line),
        }
    }
}
