//! Lane routing tests
//!
//! Concurrent pools per priority, and the injected serial main lane.

mod routing;
