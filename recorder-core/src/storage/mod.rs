pub mod metadata;
pub mod settings;
pub mod take_manager;
pub mod track_writer;
