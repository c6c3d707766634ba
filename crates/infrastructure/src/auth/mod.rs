//! Token decoding adapters

mod jwt_codec;

pub use jwt_codec::JwtTokenCodec;
