pub mod device;
pub mod dualshock4;
pub mod switch;
pub mod transport;
