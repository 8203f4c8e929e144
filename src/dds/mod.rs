pub mod adapters;
pub mod datawriter;
pub mod ddsdata;
pub mod key;
pub mod qos;
pub mod result;
pub mod sample_element;
pub mod write_data_container;
