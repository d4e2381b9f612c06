pub mod audio_buffer;
pub mod channel_mixing;
