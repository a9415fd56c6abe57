pub mod audio_backend;
pub mod recorder_delegate;
