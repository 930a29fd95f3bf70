pub mod fetch;
pub mod source;

pub use fetch::download;
pub use source::AudioSource;
