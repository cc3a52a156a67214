//! End-to-end tests against fake plugs listening on loopback
//! addresses. The fakes speak the real wire protocol, so these flows
//! exercise the sweep, the HTTP client, the SOAP calls and the
//! registry together.
#![cfg(test)]

mod discovery;
mod fake;
mod status;
