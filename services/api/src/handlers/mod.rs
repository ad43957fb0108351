pub mod admin;
pub mod locations;
pub mod public;
pub mod ws;
