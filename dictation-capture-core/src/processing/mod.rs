pub mod chunk_assembler;
pub mod loudness;
pub mod pcm_converter;
pub mod wav_format;
