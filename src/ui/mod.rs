//! Terminal output
//!
//! Status lines go to stdout, or to stderr when stdout carries the JSON report.

pub mod progress;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static JSON_MODE: AtomicBool = AtomicBool::new(false);

/// Route status lines to stderr for the rest of the run
pub fn set_json_mode(enabled: bool) {
  JSON_MODE.store(enabled, Ordering::Relaxed);
}

pub fn json_mode() -> bool {
  JSON_MODE.load(Ordering::Relaxed)
}

#[doc(hidden)]
pub fn emit(args: fmt::Arguments<'_>) {
  if json_mode() {
    eprintln!("{}", args);
  } else {
    println!("{}", args);
  }
}

/// `println!` for progress and status lines
macro_rules! status {
  ($($arg:tt)*) => {
    $crate::ui::emit(format_args!($($arg)*))
  };
}

pub(crate) use status;
