// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Pair responses with the requests that caused them.
//!
//! Each request is held as pending until a response with the same key is
//! seen, at which point it is forgotten. Responses with no pending request are
//! reported as they are found; requests still pending at the end of the log
//! are reported by [`Reconciler::finalize`].

use std::collections::HashMap;

use itertools::Itertools;
use log::{debug, info};

use crate::classify::{Access, RequestKey};
use crate::finding::{Finding, ReconcileSummary};
use crate::scan::LineVisitor;

/// Tracks in-flight requests.
#[derive(Debug, Default)]
pub struct Reconciler {
    /// Pending requests and the line each was first seen on.
    pending: HashMap<RequestKey, usize>,
    findings: Vec<Finding>,
    summary: ReconcileSummary,
}

impl Reconciler {
    /// Record a request as pending.
    ///
    /// A repeated request for a key that is already pending is absorbed and
    /// keeps the line of the first one.
    pub fn on_request(&mut self, key: &RequestKey, line: usize) {
        self.summary.requests += 1;
        if let Some(first) = self.pending.get(key) {
            debug!("{line}: request {key} already pending since line {first}");
            return;
        }
        debug!("{line}: request {key}");
        self.pending.insert(key.clone(), line);
    }

    /// Match a response against the pending requests.
    pub fn on_response(&mut self, key: &RequestKey, line: usize) {
        self.summary.responses += 1;
        match self.pending.remove(key) {
            Some(request_line) => {
                self.summary.matched += 1;
                debug!("{line}: response {key} matches request from line {request_line}");
            }
            None => {
                let finding = Finding::MissingRequest {
                    key: key.clone(),
                    line,
                };
                debug!("{line}: {finding}");
                self.findings.push(finding);
            }
        }
    }

    /// Findings reported so far, in the order they were found.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Totals seen so far.
    #[must_use]
    pub fn summary(&self) -> ReconcileSummary {
        self.summary
    }

    /// Consume the reconciler and return every finding.
    ///
    /// Responses for missing requests come first in log order, followed by
    /// the incomplete requests ordered by the line they were issued on.
    #[must_use]
    pub fn finalize(self) -> Vec<Finding> {
        info!("{}", self.summary);
        let mut findings = self.findings;
        findings.extend(
            self.pending
                .into_iter()
                .sorted_by_key(|(_, line)| *line)
                .map(|(key, line)| Finding::IncompleteRequest { key, line }),
        );
        findings
    }
}

impl LineVisitor for Reconciler {
    fn request(&mut self, line: usize, key: &RequestKey) {
        self.on_request(key, line);
    }

    fn cpu_response(&mut self, line: usize, key: &RequestKey, _access: Option<&Access>) {
        self.on_response(key, line);
    }

    fn write_response(&mut self, line: usize, key: &RequestKey, _address: &str) {
        self.on_response(key, line);
    }
}
