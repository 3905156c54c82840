pub mod reset;

pub use reset::EspDevice;
