// Module connection - device status and reopen policy

pub mod reconnect;
pub mod status;

pub use reconnect::ReconnectionStrategy;
pub use status::{AtomicDeviceStatus, DeviceStatus};
