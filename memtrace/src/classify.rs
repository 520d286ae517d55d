// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Classification of individual log lines.
//!
//! Every line of interest is printed by the simulator's debug output, which
//! prefixes the message with `<time>:<Class>::<function>():<line> <name>: `.
//! Three shapes are recognised, tried in a fixed order:
//!
//!   1. a CPU request being accepted (`handleCPURequest`).
//!   2. a response being built for the CPU (`makeCPUResponse`), optionally
//!      carrying the command, address and data of the access.
//!   3. a write response matched to its original write (`handleWriteResp`).
//!
//! Anything else is [`LogLine::Ignored`].

use std::fmt;

use regex::{Captures, Regex};

const REQUEST_PATTERN: &str = r"\d+:[^:\s]+::handleCPURequest\(\):\d+ (?<actor>[^\s:]+): \((?<first>\d+), (?<second>\d+)\)";

const CPU_RESPONSE_PATTERN: &str = concat!(
    r"\d+:[^:\s]+::makeCPUResponse\(\):\d+ (?<actor>[^\s:]+): ",
    r"Creating (?:\d+ byte )?Response to CPU: \(\d+, \d+\) ",
    r"in Response To \((?<first>\d+), (?<second>\d+)\)",
    r"(?: \[(?<command>ReadResp|WriteResp): 0x(?<address>[0-9A-Fa-f]+)\] \[(?:0x)?(?<value>[0-9A-Fa-f]*)\])?"
);

const WRITE_RESPONSE_PATTERN: &str = concat!(
    r"\d+:[^:\s]+::handleWriteResp\(\):\d+:? (?<actor>[^\s:]+):? ",
    r"Matched WriteResp to orig event WriteReq 0x(?<address>[0-9A-Fa-f]+) ",
    r"\((?<first>\d+), (?<second>\d+)\)"
);

/// Identifier the simulator gives to every memory event.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EventId(pub u64, pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Key used to pair a response with the request that caused it.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RequestKey {
    /// Name of the component that handled the request.
    pub actor: String,

    /// The request's event identifier.
    pub id: EventId,
}

impl RequestKey {
    /// Build a key from any string-like actor name.
    pub fn new(actor: impl Into<String>, id: EventId) -> Self {
        Self {
            actor: actor.into(),
            id,
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.actor, self.id)
    }
}

/// The command a response completes.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Command {
    /// A load.
    Read,
    /// A store.
    Write,
}

/// The data carried by a response to the CPU.
///
/// Addresses and values are kept as `0x` prefixed lower case hex strings so
/// that they can be compared without caring about the width of the data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Access {
    /// Whether the access was a load or a store.
    pub command: Command,

    /// Target address.
    pub address: String,

    /// Data read or written.
    pub value: String,
}

/// A classified log line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogLine {
    /// A cache accepted a request from the CPU.
    Request(RequestKey),

    /// A cache built the response to a CPU request. The key carries the
    /// identifier of the request being responded to.
    CpuResponse {
        /// Request being answered.
        key: RequestKey,
        /// Present when the line includes the command, address and data.
        access: Option<Access>,
    },

    /// A write response was matched to the original write request.
    WriteResponse {
        /// Request being answered.
        key: RequestKey,
        /// Address of the original write.
        address: String,
    },

    /// Not a line of interest.
    Ignored,
}

/// Holds the compiled patterns used to classify lines.
pub struct Classifier {
    request_re: Regex,
    cpu_response_re: Regex,
    write_response_re: Regex,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Compile the line patterns.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_re: Regex::new(REQUEST_PATTERN)
                .expect("`REQUEST_PATTERN` should be a valid regex"),
            cpu_response_re: Regex::new(CPU_RESPONSE_PATTERN)
                .expect("`CPU_RESPONSE_PATTERN` should be a valid regex"),
            write_response_re: Regex::new(WRITE_RESPONSE_PATTERN)
                .expect("`WRITE_RESPONSE_PATTERN` should be a valid regex"),
        }
    }

    /// Classify a single line (without its trailing newline).
    #[must_use]
    pub fn classify(&self, line: &str) -> LogLine {
        self.try_classify(line).unwrap_or(LogLine::Ignored)
    }

    fn try_classify(&self, line: &str) -> Option<LogLine> {
        if let Some(c) = self.request_re.captures(line) {
            return Some(LogLine::Request(request_key(&c)?));
        }

        if let Some(c) = self.cpu_response_re.captures(line) {
            let key = request_key(&c)?;
            let access = match (c.name("command"), c.name("address"), c.name("value")) {
                (Some(command), Some(address), Some(value)) => Some(Access {
                    command: if command.as_str() == "WriteResp" {
                        Command::Write
                    } else {
                        Command::Read
                    },
                    address: to_hex(address.as_str()),
                    value: to_hex(value.as_str()),
                }),
                _ => None,
            };
            return Some(LogLine::CpuResponse { key, access });
        }

        if let Some(c) = self.write_response_re.captures(line) {
            let key = request_key(&c)?;
            let address = to_hex(c.name("address")?.as_str());
            return Some(LogLine::WriteResponse { key, address });
        }

        None
    }
}

/// Build the key from the `actor`, `first` and `second` groups.
///
/// Returns `None` if either half of the identifier does not fit in a `u64`.
fn request_key(c: &Captures) -> Option<RequestKey> {
    let actor = c.name("actor")?.as_str();
    let first = c.name("first")?.as_str().parse().ok()?;
    let second = c.name("second")?.as_str().parse().ok()?;
    Some(RequestKey::new(actor, EventId(first, second)))
}

fn to_hex(digits: &str) -> String {
    format!("0x{}", digits.to_ascii_lowercase())
}
