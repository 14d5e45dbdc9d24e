pub mod streaming_encoder;
