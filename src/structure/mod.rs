pub mod duration;
pub mod guid;
pub mod instance_handle;
pub mod sequence_number;
pub mod time;
