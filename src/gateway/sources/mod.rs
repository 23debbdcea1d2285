//! Response source implementations.
//!
//! `demo` answers locally from a keyword table; `live` talks to the
//! deployed Watson ML service. Adding a source = new module + new
//! [`ResponseSource`](super::ResponseSource) variant + new match arm.

pub mod demo;
pub mod live;
