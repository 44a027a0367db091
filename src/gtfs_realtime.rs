//! GTFS-realtime messages generated from `proto/gtfs-realtime.proto`.
//!
//! Every message also derives `serde::Serialize`, so a decoded entity can be
//! stored field for field.

#![allow(clippy::all)]

include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
