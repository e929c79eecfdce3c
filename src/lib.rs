//! Navigation and listing synchronisation for a remote directory browser.
//!
//! A [`browser::Browser`] owns the navigation history, the listing view and
//! the selection, and talks to the listing server through a
//! [`session::Session`] via the [`correlator::Correlator`].

pub mod browser;
pub mod cli;
pub mod config;
pub mod correlator;
pub mod error;
pub mod history;
pub mod listing;
pub mod logging;
pub mod media;
pub mod protocol;
pub mod selection;
pub mod session;
