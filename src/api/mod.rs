pub mod elevenlabs;
pub mod ollama;
pub mod pexels;
pub mod telegram;
