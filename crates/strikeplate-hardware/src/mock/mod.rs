//! Mock serial ports for development and testing.
//!
//! [`MockSerialPort`] is a single in-memory port driven through a
//! [`MockSerialPortHandle`]; [`MockPorts`] is a [`PortProvider`] holding a
//! set of such ports so that port enumeration and open failures can be
//! exercised without hardware.
//!
//! [`PortProvider`]: crate::traits::PortProvider

pub mod serial;

pub use serial::{MockPorts, MockSerialPort, MockSerialPortHandle, WriteRecord};
