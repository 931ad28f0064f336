//! Defines the [`Termination`] trait.

use std::{convert::Infallible, fmt::Debug, process};

/// Extends [`std::process::Termination`] with a success check.
///
/// Not every platform lets the windowing event loop return, so [`gui::run`][crate::gui::run]
/// exits the process itself and uses this to pick the exit status.
pub trait Termination: process::Termination {
    fn is_success(&self) -> bool;
}

impl Termination for Infallible {
    fn is_success(&self) -> bool {
        match *self {}
    }
}

impl Termination for () {
    fn is_success(&self) -> bool {
        true
    }
}

impl<T: Termination, E: Debug> Termination for Result<T, E> {
    fn is_success(&self) -> bool {
        match self {
            Ok(term) => term.is_success(),
            Err(_) => false,
        }
    }
}
