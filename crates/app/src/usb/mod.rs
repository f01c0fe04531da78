//! USB subsystem
//!
//! All rusb calls run on a dedicated worker thread; the app loop talks to it
//! over the channel bridge in `common::channel`.

pub mod broker;
pub mod scanner;
pub mod worker;

pub use broker::UsbPermissionBroker;
pub use scanner::DeviceScanner;
pub use worker::spawn_usb_worker;
