pub mod analysis_history;
pub mod analysis_service;
pub mod chat_service;
pub mod dashboard_service;
pub mod inference_client;
pub mod qr_decoder;
pub mod scam_history;
pub mod scam_service;
pub mod settings_service;
