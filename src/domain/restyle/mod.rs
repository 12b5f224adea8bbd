//! Restyle domain module

mod request;

pub use request::{Fingerprint, RestyleRequest, VoiceStyleId};
