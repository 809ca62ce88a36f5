//! External service integrations.

pub mod affinity_client {
    pub use crate::affinity_client::*;
}
