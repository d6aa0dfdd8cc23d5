// Services module - external collaborators and the reconciliation steps built on them

pub mod catalog;
pub mod content_directory;
pub mod fingerprint;
pub mod resolver;

// Metadata providers
pub mod tmdb;
