// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Drive the checkers over a log.
//!
//! Lines are read in order, classified and handed to a [`LineVisitor`] before
//! the next line is read. There is exactly one pass and no buffering of
//! classified events.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, trace};
use serde::{Deserialize, Serialize};

use crate::classify::{Access, Classifier, LogLine, RequestKey};
use crate::error::{ScanError, ScanResult};
use crate::finding::{Finding, ReconcileSummary, ValueSummary};
use crate::reconcile::Reconciler;
use crate::values::ValueChecker;

/// Path which is taken to mean standard input.
pub const STDIN_PATH: &str = "-";

/// The `LineVisitor` trait is the interface that allows a checker to see all
/// the classified lines of a log as it is processed.
///
/// All methods default to doing nothing so a checker only implements the
/// events it cares about. `line` is always the 1-based line number.
pub trait LineVisitor {
    /// A cache accepted a CPU request.
    fn request(&mut self, line: usize, key: &RequestKey) {
        // Remove the unused variable warnings
        let _ = line;
        let _ = key;
    }

    /// A response to the CPU was created for the request `key`.
    fn cpu_response(&mut self, line: usize, key: &RequestKey, access: Option<&Access>) {
        // Remove the unused variable warnings
        let _ = line;
        let _ = key;
        let _ = access;
    }

    /// A write response was matched to the original write `key`.
    fn write_response(&mut self, line: usize, key: &RequestKey, address: &str) {
        // Remove the unused variable warnings
        let _ = line;
        let _ = key;
        let _ = address;
    }

    /// A line that is not of interest.
    fn ignored(&mut self, line: usize, text: &str) {
        // Remove the unused variable warnings
        let _ = line;
        let _ = text;
    }
}

/// Feed every event to both visitors, first `A` then `B`.
impl<A, B> LineVisitor for (A, B)
where
    A: LineVisitor,
    B: LineVisitor,
{
    fn request(&mut self, line: usize, key: &RequestKey) {
        self.0.request(line, key);
        self.1.request(line, key);
    }

    fn cpu_response(&mut self, line: usize, key: &RequestKey, access: Option<&Access>) {
        self.0.cpu_response(line, key, access);
        self.1.cpu_response(line, key, access);
    }

    fn write_response(&mut self, line: usize, key: &RequestKey, address: &str) {
        self.0.write_response(line, key, address);
        self.1.write_response(line, key, address);
    }

    fn ignored(&mut self, line: usize, text: &str) {
        self.0.ignored(line, text);
        self.1.ignored(line, text);
    }
}

/// Lets an optional checker sit in a visitor pair.
impl<V> LineVisitor for Option<V>
where
    V: LineVisitor,
{
    fn request(&mut self, line: usize, key: &RequestKey) {
        if let Some(visitor) = self {
            visitor.request(line, key);
        }
    }

    fn cpu_response(&mut self, line: usize, key: &RequestKey, access: Option<&Access>) {
        if let Some(visitor) = self {
            visitor.cpu_response(line, key, access);
        }
    }

    fn write_response(&mut self, line: usize, key: &RequestKey, address: &str) {
        if let Some(visitor) = self {
            visitor.write_response(line, key, address);
        }
    }

    fn ignored(&mut self, line: usize, text: &str) {
        if let Some(visitor) = self {
            visitor.ignored(line, text);
        }
    }
}

/// Counts of what a pass over the log saw.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ScanStats {
    /// Number of lines read.
    pub lines: usize,
    /// Number of lines that matched one of the known shapes.
    pub classified: usize,
}

/// Process a log calling the visitor for each line found.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected, so such
/// lines are simply ignored unless the damage is outside the fields matched.
///
/// # Examples
///
/// A simple visitor that counts the requests issued.
/// ```
/// use memtrace::classify::{Classifier, RequestKey};
/// use memtrace::scan::{LineVisitor, process_log};
///
/// #[derive(Default)]
/// struct RequestCounter {
///     count: usize,
/// }
///
/// impl LineVisitor for RequestCounter {
///     fn request(&mut self, _line: usize, _key: &RequestKey) {
///         self.count += 1;
///     }
/// }
///
/// let log = "5:Cache::handleCPURequest():465 l1: (1, 0) 0x40 READ MISS\n";
/// let mut visitor = RequestCounter::default();
/// let stats = process_log(log.as_bytes(), &Classifier::new(), &mut visitor).unwrap();
/// assert_eq!(visitor.count, 1);
/// assert_eq!(stats.lines, 1);
/// ```
pub fn process_log<R>(
    mut reader: R,
    classifier: &Classifier,
    visitor: &mut dyn LineVisitor,
) -> ScanResult<ScanStats>
where
    R: BufRead,
{
    let mut stats = ScanStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let line_no = stats.lines + 1;
        let num_read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| ScanError::Read {
                line: line_no,
                source,
            })?;
        if num_read == 0 {
            break;
        }
        stats.lines = line_no;

        let text = String::from_utf8_lossy(trim_newline(&buf));
        match classifier.classify(&text) {
            LogLine::Request(key) => visitor.request(line_no, &key),
            LogLine::CpuResponse { key, access } => {
                visitor.cpu_response(line_no, &key, access.as_ref());
            }
            LogLine::WriteResponse { key, address } => {
                visitor.write_response(line_no, &key, &address);
            }
            LogLine::Ignored => {
                trace!("{line_no}: ignored");
                visitor.ignored(line_no, &text);
                continue;
            }
        }
        stats.classified += 1;
    }

    Ok(stats)
}

fn trim_newline(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// Which checkers to run over a log.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// Reconcile requests with responses.
    #[default]
    Reqs,
    /// Check loaded values against stored values.
    Vals,
    /// Run both checks in the same pass.
    All,
}

impl CheckMode {
    fn reconciles(self) -> bool {
        matches!(self, CheckMode::Reqs | CheckMode::All)
    }

    fn checks_values(self) -> bool {
        matches!(self, CheckMode::Vals | CheckMode::All)
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CheckMode::Reqs => "reqs",
            CheckMode::Vals => "vals",
            CheckMode::All => "all",
        };
        write!(f, "{name}")
    }
}

impl FromStr for CheckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reqs" => Ok(CheckMode::Reqs),
            "vals" => Ok(CheckMode::Vals),
            "all" => Ok(CheckMode::All),
            _ => Err(format!(
                "Unknown check '{s}', expected one of 'reqs', 'vals' or 'all'"
            )),
        }
    }
}

/// Everything reported by a scan.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScanReport {
    /// Request/response findings followed by value mismatches.
    pub findings: Vec<Finding>,

    /// Present when the reconciler was run.
    pub requests: Option<ReconcileSummary>,

    /// Present when the value checker was run.
    pub values: Option<ValueSummary>,

    /// What the pass saw.
    pub stats: ScanStats,
}

impl ScanReport {
    /// Whether any anomaly was reported.
    #[must_use]
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }

    /// Write the report, one finding per line followed by the value summary.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for finding in &self.findings {
            writeln!(writer, "{finding}")?;
        }
        if let Some(summary) = &self.values {
            writeln!(writer, "{summary}")?;
        }
        Ok(())
    }
}

/// Run the checks selected by `mode` over an already open log.
pub fn scan_reader<R>(reader: R, mode: CheckMode) -> ScanResult<ScanReport>
where
    R: BufRead,
{
    let classifier = Classifier::new();
    let mut checkers = (
        mode.reconciles().then(Reconciler::default),
        mode.checks_values().then(ValueChecker::default),
    );
    let stats = process_log(reader, &classifier, &mut checkers)?;
    info!(
        "Read {} lines, {} of interest",
        stats.lines, stats.classified
    );

    let mut report = ScanReport {
        stats,
        ..Default::default()
    };

    let (reconciler, value_checker) = checkers;
    if let Some(reconciler) = reconciler {
        report.requests = Some(reconciler.summary());
        report.findings.extend(reconciler.finalize());
    }
    if let Some(value_checker) = value_checker {
        let (findings, summary) = value_checker.finalize();
        report.findings.extend(findings);
        report.values = Some(summary);
    }

    Ok(report)
}

/// Open the log at `path` and run the checks selected by `mode`.
///
/// A path of `-` reads standard input. The file is closed before returning.
pub fn scan_file(path: &Path, mode: CheckMode) -> ScanResult<ScanReport> {
    info!("Running '{mode}' checks on {}", path.display());
    if path.as_os_str() == STDIN_PATH {
        return scan_reader(io::stdin().lock(), mode);
    }

    let file = File::open(path).map_err(|source| ScanError::Open {
        path: PathBuf::from(path),
        source,
    })?;
    scan_reader(BufReader::new(file), mode)
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;
    use crate::classify::EventId;

    const LOG: &str = "\
100:Cache::handleCPURequest():465 l1: (1, 0) 0x100 WRITE MISS (block 0x100 [-1])
110:Cache::makeCPUResponse():592 l1: Creating Response to CPU: (20, 0) in Response To (1, 0) [WriteResp: 0x100] [0x0A]
120:Cache::handleCPURequest():465 l1: (2, 0) 0x100 READ HIT (block 0x100 [2])
130:Cache::makeCPUResponse():592 l1: Creating Response to CPU: (21, 0) in Response To (2, 0) [ReadResp: 0x100] [0x0B]
140:Cache::handleCPURequest():465 l1: (3, 0) 0x200 READ MISS (block 0x200 [-1])
150:Cache::handleWriteResp():1967: l2 Matched WriteResp to orig event WriteReq 0x300 (9, 0) [from 0]
160:MemController::handleEvent():90 memory: unrelated
";

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl LineVisitor for Recorder {
        fn request(&mut self, line: usize, key: &RequestKey) {
            self.events.push(format!("{line} req {key}"));
        }

        fn cpu_response(&mut self, line: usize, key: &RequestKey, access: Option<&Access>) {
            self.events
                .push(format!("{line} cpu {key} {}", access.is_some()));
        }

        fn write_response(&mut self, line: usize, key: &RequestKey, address: &str) {
            self.events.push(format!("{line} wr {key} {address}"));
        }

        fn ignored(&mut self, line: usize, _text: &str) {
            self.events.push(format!("{line} ignored"));
        }
    }

    #[test]
    fn visits_in_log_order() {
        let mut recorder = Recorder::default();
        let stats = process_log(LOG.as_bytes(), &Classifier::new(), &mut recorder).unwrap();

        assert_eq!(
            stats,
            ScanStats {
                lines: 7,
                classified: 6
            }
        );
        assert_eq!(
            recorder.events,
            vec![
                "1 req l1 (1, 0)",
                "2 cpu l1 (1, 0) true",
                "3 req l1 (2, 0)",
                "4 cpu l1 (2, 0) true",
                "5 req l1 (3, 0)",
                "6 wr l2 (9, 0) 0x300",
                "7 ignored",
            ]
        );
    }

    #[test]
    fn handles_crlf_and_missing_final_newline() {
        let log = "1:Cache::handleCPURequest():465 l1: (1, 0) x\r\n\
                   2:Cache::handleCPURequest():465 l1: (2, 0) x";
        let mut recorder = Recorder::default();
        let stats = process_log(log.as_bytes(), &Classifier::new(), &mut recorder).unwrap();
        assert_eq!(stats.lines, 2);
        assert_eq!(recorder.events, vec!["1 req l1 (1, 0)", "2 req l1 (2, 0)"]);
    }

    #[test]
    fn invalid_utf8_is_not_fatal() {
        let mut log = b"1:Cache::handleCPURequest():465 l1: (1, 0) x\n".to_vec();
        log.extend_from_slice(&[0xff, 0xfe, b'\n']);
        let mut recorder = Recorder::default();
        let stats = process_log(log.as_slice(), &Classifier::new(), &mut recorder).unwrap();
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.classified, 1);
    }

    #[test]
    fn reqs_mode() {
        let report = scan_reader(LOG.as_bytes(), CheckMode::Reqs).unwrap();
        let lines: Vec<String> = report.findings.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "Found response for missing request: l2 (9, 0)",
                "Incomplete request:   l1 (3, 0)",
            ]
        );
        assert!(report.values.is_none());
        assert_eq!(
            report.requests,
            Some(ReconcileSummary {
                requests: 3,
                responses: 3,
                matched: 2
            })
        );
    }

    #[test]
    fn vals_mode() {
        let report = scan_reader(LOG.as_bytes(), CheckMode::Vals).unwrap();
        assert_eq!(
            report.findings,
            vec![Finding::ValueMismatch {
                id: EventId(2, 0),
                address: "0x100".to_string(),
                observed: "0x0b".to_string(),
                expected: "0x0a".to_string(),
                line: 4,
            }]
        );
        assert_eq!(
            report.values,
            Some(ValueSummary {
                stores: 1,
                matched_loads: 1,
                total_loads: 1
            })
        );
    }

    #[test]
    fn empty_payload_counts_as_load() {
        let log = "\
1:Cache::makeCPUResponse():592 l1: Creating Response to CPU: (20, 0) in Response To (1, 0) [WriteResp: 0x100] [0x]
2:Cache::makeCPUResponse():592 l1: Creating Response to CPU: (21, 0) in Response To (2, 0) [ReadResp: 0x100] [0x]
";
        let report = scan_reader(log.as_bytes(), CheckMode::Vals).unwrap();
        assert!(report.findings.is_empty());
        assert_eq!(
            report.values,
            Some(ValueSummary {
                stores: 1,
                matched_loads: 1,
                total_loads: 1
            })
        );
    }

    #[test]
    fn all_mode_is_union() {
        let reqs = scan_reader(LOG.as_bytes(), CheckMode::Reqs).unwrap();
        let vals = scan_reader(LOG.as_bytes(), CheckMode::Vals).unwrap();
        let all = scan_reader(LOG.as_bytes(), CheckMode::All).unwrap();

        let mut expected = reqs.findings.clone();
        expected.extend(vals.findings.clone());
        assert_eq!(all.findings, expected);
        assert_eq!(all.values, vals.values);
        assert_eq!(all.requests, reqs.requests);
    }

    #[test]
    fn report_output() {
        let report = scan_reader(LOG.as_bytes(), CheckMode::All).unwrap();
        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Found response for missing request: l2 (9, 0)\n\
             Incomplete request:   l1 (3, 0)\n\
             Read (2, 0) of address 0x100 has value 0x0b. Does not match old value of 0x0a.\n\
             Checked 1 stores, matched 1 loads (1 total)\n"
        );
    }

    #[test]
    fn rescanning_a_file_gives_the_same_report() {
        let mut file = NamedTempFile::new().expect("test should be able to create a tempfile");
        write!(file, "{LOG}").expect("test should be able to write to tempfile");

        let first = scan_file(file.path(), CheckMode::All).unwrap();
        let second = scan_file(file.path(), CheckMode::All).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_file() {
        let result = scan_file(Path::new("does/not/exist.log"), CheckMode::Reqs);
        assert!(matches!(result, Err(ScanError::Open { .. })));
    }

    #[test]
    fn check_mode_names() {
        for mode in [CheckMode::Reqs, CheckMode::Vals, CheckMode::All] {
            assert_eq!(mode.to_string().parse::<CheckMode>(), Ok(mode));
        }
        assert_eq!("VALS".parse::<CheckMode>(), Ok(CheckMode::Vals));
        assert!("both".parse::<CheckMode>().is_err());
    }
}
