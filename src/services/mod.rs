pub mod apple_music;
pub mod console;
pub mod spotify;
pub mod sync;
