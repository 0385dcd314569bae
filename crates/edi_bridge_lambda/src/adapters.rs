//! Traits at every external seam plus their production clients.

pub mod guides;
pub mod http;
pub mod mapping;
pub mod object_store;
pub mod sequence;
pub mod translate;
pub mod webhook;
