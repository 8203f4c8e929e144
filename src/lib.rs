//! Writer-side sample lifecycle and delivery engine for a
//! [DDS](https://www.omg.org/spec/DDS/About-DDS/) implementation.
//!
//! This crate provides the machinery that sits between an application
//! `DataWriter` and a transport: per-instance retention of serialized
//! samples under HISTORY / RESOURCE_LIMITS QoS, blocking or evicting
//! admission control for new writes, strictly ordered wrap-safe
//! [`SequenceNumber`](structure::sequence_number::SequenceNumber)
//! assignment, and the CDR serialization used to produce sample payloads.
//!
//! The central type is
//! [`WriteDataContainer`](dds::write_data_container::WriteDataContainer),
//! which owns the unsent/sending/sent/orphaned sample lists and the
//! instance registry. A transport consumes batches from
//! [`get_unsent_data`](dds::write_data_container::WriteDataContainer::get_unsent_data)
//! and reports completion through `data_delivered` / `data_dropped`.
//!
//! Discovery, QoS matching, and the RTPS message grammar are out of scope;
//! the transport is an opaque consumer of sample buffers behind the
//! [`TransportClient`](transport::TransportClient) seam.


pub mod dds;
pub mod serialization;
pub mod structure;
pub mod transport;

pub use crate::{
  dds::{
    datawriter::DataWriter,
    key::{Key, Keyed},
    qos::{QosPolicies, QosPolicyBuilder},
    result::{Error, Result},
    write_data_container::{ContainerConfig, WriteDataContainer},
  },
  structure::sequence_number::SequenceNumber,
};
