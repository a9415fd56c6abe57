pub mod demux;
pub mod level_meter;
pub mod ring_buffer;
pub mod wav_format;
