//! Fault taxonomy and validation.
//!
//! A [`FaultRequest`] is the loosely-typed shape callers send over the wire;
//! [`FaultDescriptor::from_request`] is the only way to turn one into a
//! descriptor, for both the queued and the immediate path. Parameters that do
//! not apply to a kind have no representation in [`Fault`], so two
//! descriptors that only differed in irrelevant fields are equal by
//! construction.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use modbus_frame::{ExceptionCode, Frame, EXCEPTION_FLAG};

use crate::emulate::EmulationOutcome;
use crate::error::{HarnessError, HarnessResult};

/// Upper bound for `DELAY` faults, inclusive.
pub const MAX_DELAY_MS: u32 = 60_000;
/// Highest unicast slave address.
pub const MAX_SLAVE_ADDRESS: u8 = 247;
/// Address assumed when a queued fault does not name one.
pub const DEFAULT_SLAVE_ADDRESS: u8 = 1;
/// Read Holding Registers, the dashboard's default.
pub const DEFAULT_FUNCTION_CODE: u8 = 0x03;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultKind {
    Exception,
    CrcError,
    Corrupt,
    PacketDrop,
    Delay,
}

impl FaultKind {
    pub const ALL: [FaultKind; 5] = [
        FaultKind::Exception,
        FaultKind::CrcError,
        FaultKind::Corrupt,
        FaultKind::PacketDrop,
        FaultKind::Delay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FaultKind::Exception => "EXCEPTION",
            FaultKind::CrcError => "CRC_ERROR",
            FaultKind::Corrupt => "CORRUPT",
            FaultKind::PacketDrop => "PACKET_DROP",
            FaultKind::Delay => "DELAY",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        FaultKind::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fault together with exactly the parameters its kind needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fault {
    Exception(ExceptionCode),
    CrcError,
    Corrupt,
    PacketDrop,
    Delay { millis: u32 },
}

impl Fault {
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::Exception(_) => FaultKind::Exception,
            Fault::CrcError => FaultKind::CrcError,
            Fault::Corrupt => FaultKind::Corrupt,
            Fault::PacketDrop => FaultKind::PacketDrop,
            Fault::Delay { .. } => FaultKind::Delay,
        }
    }
}

/// Raw fault parameters as received from a caller.
///
/// Numbers are kept wide so out-of-range input is reported as an invalid
/// parameter instead of a decoding failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaultRequest {
    pub error_type: String,
    pub slave_address: Option<i64>,
    pub function_code: Option<i64>,
    pub exception_code: Option<i64>,
    pub delay_ms: Option<i64>,
}

impl FaultRequest {
    pub fn new(error_type: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            ..Self::default()
        }
    }

    pub fn target(mut self, slave_address: i64, function_code: i64) -> Self {
        self.slave_address = Some(slave_address);
        self.function_code = Some(function_code);
        self
    }

    pub fn exception_code(mut self, code: i64) -> Self {
        self.exception_code = Some(code);
        self
    }

    pub fn delay_ms(mut self, millis: i64) -> Self {
        self.delay_ms = Some(millis);
        self
    }
}

/// A validated fault aimed at one slave/function pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaultDescriptor {
    slave_address: u8,
    function_code: u8,
    fault: Fault,
}

impl FaultDescriptor {
    pub fn new(slave_address: u8, function_code: u8, fault: Fault) -> HarnessResult<Self> {
        check_slave(slave_address as i64)?;
        check_function(function_code as i64)?;
        if let Fault::Delay { millis } = fault {
            check_delay(millis as i64)?;
        }
        Ok(Self {
            slave_address,
            function_code,
            fault,
        })
    }

    /// Validates a raw request; the single source of truth for both paths.
    pub fn from_request(request: &FaultRequest) -> HarnessResult<Self> {
        let kind = FaultKind::parse(&request.error_type).ok_or_else(|| {
            HarnessError::invalid(
                "errorType",
                format!(
                    "unknown fault type {:?}; expected one of EXCEPTION, CRC_ERROR, CORRUPT, PACKET_DROP, DELAY",
                    request.error_type
                ),
            )
        })?;

        let slave_address = check_slave(
            request
                .slave_address
                .unwrap_or(DEFAULT_SLAVE_ADDRESS as i64),
        )?;
        let function_code = check_function(
            request
                .function_code
                .unwrap_or(DEFAULT_FUNCTION_CODE as i64),
        )?;

        if kind != FaultKind::Exception {
            reject_irrelevant("exceptionCode", request.exception_code, kind)?;
        }
        if kind != FaultKind::Delay {
            reject_irrelevant("delayMs", request.delay_ms, kind)?;
        }

        let fault = match kind {
            FaultKind::Exception => {
                let raw = request
                    .exception_code
                    .ok_or_else(|| HarnessError::invalid("exceptionCode", "required for EXCEPTION"))?;
                let code = u8::try_from(raw)
                    .ok()
                    .and_then(ExceptionCode::from_u8)
                    .ok_or_else(|| {
                        HarnessError::invalid(
                            "exceptionCode",
                            format!("{raw} is not one of 1, 2, 3, 4, 5, 6, 8, 10, 11"),
                        )
                    })?;
                Fault::Exception(code)
            }
            FaultKind::CrcError => Fault::CrcError,
            FaultKind::Corrupt => Fault::Corrupt,
            FaultKind::PacketDrop => Fault::PacketDrop,
            FaultKind::Delay => {
                let raw = request
                    .delay_ms
                    .ok_or_else(|| HarnessError::invalid("delayMs", "required for DELAY"))?;
                Fault::Delay {
                    millis: check_delay(raw)?,
                }
            }
        };

        Ok(Self {
            slave_address,
            function_code,
            fault,
        })
    }

    #[inline]
    pub fn kind(&self) -> FaultKind {
        self.fault.kind()
    }

    #[inline]
    pub fn fault(&self) -> Fault {
        self.fault
    }

    #[inline]
    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    #[inline]
    pub fn function_code(&self) -> u8 {
        self.function_code
    }

    /// Exception code, or `0` for other kinds.
    pub fn exception_code(&self) -> u8 {
        match self.fault {
            Fault::Exception(code) => code.as_u8(),
            _ => 0,
        }
    }

    /// Delay in milliseconds, or `0` for other kinds.
    pub fn delay_ms(&self) -> u32 {
        match self.fault {
            Fault::Delay { millis } => millis,
            _ => 0,
        }
    }

    /// Turns a well-formed response into what the device should receive.
    pub fn apply(&self, base: Frame) -> EmulationOutcome {
        match self.fault {
            Fault::Exception(code) => EmulationOutcome::Frame(base.into_exception(code)),
            Fault::CrcError => EmulationOutcome::Frame(base.with_inverted_crc()),
            Fault::Corrupt => EmulationOutcome::Frame(base.with_corrupted_payload()),
            Fault::PacketDrop => EmulationOutcome::NoResponse,
            Fault::Delay { millis } => EmulationOutcome::DelayedFrame {
                frame: base,
                delay: Duration::from_millis(millis as u64),
            },
        }
    }
}

impl fmt::Display for FaultDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (slave {}, fn 0x{:02X}",
            self.kind(),
            self.slave_address,
            self.function_code
        )?;
        match self.fault {
            Fault::Exception(code) => write!(f, ", code {})", code.as_u8()),
            Fault::Delay { millis } => write!(f, ", {millis} ms)"),
            _ => f.write_str(")"),
        }
    }
}

/// Flat JSON view with irrelevant fields reported as zero.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorView {
    error_type: FaultKind,
    slave_address: u8,
    function_code: u8,
    exception_code: u8,
    delay_ms: u32,
}

impl Serialize for FaultDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DescriptorView {
            error_type: self.kind(),
            slave_address: self.slave_address,
            function_code: self.function_code,
            exception_code: self.exception_code(),
            delay_ms: self.delay_ms(),
        }
        .serialize(serializer)
    }
}

fn check_slave(raw: i64) -> HarnessResult<u8> {
    match u8::try_from(raw) {
        Ok(addr) if (1..=MAX_SLAVE_ADDRESS).contains(&addr) => Ok(addr),
        _ => Err(HarnessError::invalid(
            "slaveAddress",
            format!("{raw} is outside 1..={MAX_SLAVE_ADDRESS}"),
        )),
    }
}

fn check_function(raw: i64) -> HarnessResult<u8> {
    match u8::try_from(raw) {
        Ok(code) if code != 0 && code & EXCEPTION_FLAG == 0 => Ok(code),
        _ => Err(HarnessError::invalid(
            "functionCode",
            format!("{raw} is not a request function code (1..=127)"),
        )),
    }
}

fn check_delay(raw: i64) -> HarnessResult<u32> {
    match u32::try_from(raw) {
        Ok(millis) if millis <= MAX_DELAY_MS => Ok(millis),
        _ => Err(HarnessError::invalid(
            "delayMs",
            format!("{raw} is outside 0..={MAX_DELAY_MS}"),
        )),
    }
}

/// Zero is what dashboards send for fields they do not use; anything else
/// contradicts the chosen kind.
fn reject_irrelevant(field: &'static str, value: Option<i64>, kind: FaultKind) -> HarnessResult<()> {
    match value {
        None | Some(0) => Ok(()),
        Some(v) => Err(HarnessError::invalid(
            field,
            format!("{v} given but {kind} takes no {field}"),
        )),
    }
}
