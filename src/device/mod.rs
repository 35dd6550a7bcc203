pub mod live_device;
pub mod mock;

pub use live_device::{DeviceResult, DeviceStatus, LiveDevice};
pub use mock::MockDevice;
