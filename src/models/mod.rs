pub mod analysis;
pub mod chat;
pub mod dashboard;
pub mod scam;
pub mod settings;
