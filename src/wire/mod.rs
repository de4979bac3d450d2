//! Byte-level builders and parsers for the protocols probed without a
//! client library. Everything here is pure and socket free; the executors
//! wire these functions to TCP streams.

pub mod mongo;
pub mod mysql;
pub mod postgres;
pub mod resp;
pub mod tds;
