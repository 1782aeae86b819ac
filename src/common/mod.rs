pub mod crc6;
pub mod frame;
pub mod oti;
pub mod partition;
