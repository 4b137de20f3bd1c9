//! Back-translation providers for slide comparison.

pub mod cache;
pub mod google;

pub use cache::{CachedTranslator, TranslationCache};
pub use google::{GoogleConfig, GoogleTranslator};
