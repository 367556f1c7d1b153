//! Immediate emulation: a fault frame on demand, with no device state.

use std::time::Duration;

use modbus_frame::Frame;

use crate::fault::FaultDescriptor;

/// What a device would observe in response to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmulationOutcome {
    Frame(Frame),
    /// Nothing comes back at all. Distinct from an empty frame.
    NoResponse,
    /// `frame` becomes available only after `delay`.
    DelayedFrame { frame: Frame, delay: Duration },
}

impl EmulationOutcome {
    /// Frame the device eventually receives, if any.
    pub fn frame(&self) -> Option<&Frame> {
        match self {
            EmulationOutcome::Frame(frame) | EmulationOutcome::DelayedFrame { frame, .. } => {
                Some(frame)
            }
            EmulationOutcome::NoResponse => None,
        }
    }

    pub fn into_frame(self) -> Option<Frame> {
        match self {
            EmulationOutcome::Frame(frame) | EmulationOutcome::DelayedFrame { frame, .. } => {
                Some(frame)
            }
            EmulationOutcome::NoResponse => None,
        }
    }

    pub fn delay(&self) -> Duration {
        match self {
            EmulationOutcome::DelayedFrame { delay, .. } => *delay,
            _ => Duration::ZERO,
        }
    }

    pub fn is_no_response(&self) -> bool {
        matches!(self, EmulationOutcome::NoResponse)
    }
}

/// Synthesizes the faulty response to the descriptor's own request.
///
/// Pure: no queue, ledger or clock is involved. The caller is responsible
/// for honouring [`EmulationOutcome::delay`].
pub fn emulate(descriptor: &FaultDescriptor) -> EmulationOutcome {
    let base = Frame::nominal_response(descriptor.slave_address(), descriptor.function_code());
    descriptor.apply(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultRequest;

    fn descriptor(request: FaultRequest) -> FaultDescriptor {
        FaultDescriptor::from_request(&request).expect("valid request")
    }

    #[test]
    fn exception_code_four_on_read_holding_registers() {
        let outcome = emulate(&descriptor(
            FaultRequest::new("EXCEPTION").target(1, 3).exception_code(4),
        ));
        let frame = outcome.frame().expect("frame");
        assert_eq!(frame.to_bytes(), vec![0x01, 0x83, 0x04, 0x40, 0xF3]);
        assert!(frame.crc_is_valid());
        assert_eq!(outcome.delay(), Duration::ZERO);
    }

    #[test]
    fn crc_error_keeps_nominal_body() {
        let outcome = emulate(&descriptor(FaultRequest::new("CRC_ERROR").target(0x11, 3)));
        let frame = outcome.frame().expect("frame");
        let nominal = Frame::nominal_response(0x11, 3);
        assert_eq!(frame.payload(), nominal.payload());
        assert!(!frame.crc_is_valid());
    }

    #[test]
    fn packet_drop_has_no_frame() {
        let outcome = emulate(&descriptor(FaultRequest::new("PACKET_DROP")));
        assert!(outcome.is_no_response());
        assert_eq!(outcome.frame(), None);
    }

    #[test]
    fn delay_carries_the_untouched_frame() {
        let outcome = emulate(&descriptor(FaultRequest::new("DELAY").target(1, 6).delay_ms(500)));
        assert_eq!(outcome.delay(), Duration::from_millis(500));
        assert_eq!(outcome.into_frame(), Some(Frame::nominal_response(1, 6)));
    }
}
