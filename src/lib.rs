//! gridd - grid control plane.
//!
//! Places regions on hosts, scopes what each operator can see by estate,
//! and collects telemetry from worker nodes. Clients talk JSON over a
//! WebSocket; nodes stream newline-delimited JSON over TCP.

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod hostops;
pub mod http;
pub mod metrics;
pub mod network;
pub mod nodes;
pub mod security;
pub mod session;
pub mod state;
pub mod telemetry;
