pub mod beacon;
pub mod clock;
pub mod source;
