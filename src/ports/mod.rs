pub mod console;
pub mod destination;
pub mod source;
