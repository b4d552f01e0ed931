/// Router Module Index
///
/// Routes are split by access level. The split is what enforces access: the
/// admin router carries the gate as a route layer, the public one carries none.

/// Routes reachable without signing in: login, logout, registration, health.
pub mod public;

/// The management console. Every route passes through `admin_gate`.
pub mod admin;
