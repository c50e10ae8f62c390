//! HTTP end-to-end tests: each test spawns the server on 127.0.0.1:0 with a mock model
//! and drives it with reqwest.

mod common;
mod message;
mod sessions;
mod tool_call_status;
