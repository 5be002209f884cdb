pub mod records;
pub mod results;
pub mod round;
