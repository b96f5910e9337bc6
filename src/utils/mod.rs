pub mod fingerprint;
pub mod logger;
pub mod redact;
pub mod schema;
