pub mod address;
pub mod currency;

pub use address::*;
pub use currency::*;
