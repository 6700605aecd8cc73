pub mod content;

pub use content::{fingerprint, Fingerprint};
