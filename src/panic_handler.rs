use log::error;
use std::panic;

use crate::pdf::ViewerError;

/// Report panics readably and make sure they reach the log file first.
///
/// Debug builds get `better_panic` backtraces, release builds the
/// `human_panic` crash report.
pub fn initialize_panic_handler() {
    if cfg!(debug_assertions) {
        better_panic::install();
    } else {
        human_panic::setup_panic!();
    }

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("Panic: {panic_info}");
        log::logger().flush();

        default_hook(panic_info);

        std::process::exit(1);
    }));
}

/// Log an unrecoverable error and terminate the process
pub fn die(err: &ViewerError) -> ! {
    error!("Fatal: {err}");
    log::logger().flush();
    eprintln!("folio: fatal error: {err}");
    std::process::exit(1);
}
