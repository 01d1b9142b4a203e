//! Subcommand implementations.

pub(crate) mod audit;
pub(crate) mod chat;
pub(crate) mod daemon;
pub(crate) mod doctor;
pub(crate) mod init;
pub(crate) mod keys;
pub(crate) mod onboarding;
pub(crate) mod sessions;
