pub mod kv_repository;
pub mod settings_repository;
