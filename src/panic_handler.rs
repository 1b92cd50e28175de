use std::panic;

use log::error;

pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Render threads panic silently otherwise; get it into the log file
        let thread = std::thread::current();
        error!(
            "Panic in thread {}: {panic_info}",
            thread.name().unwrap_or("<unnamed>")
        );
        log::logger().flush();

        default_hook(panic_info);

        std::process::exit(1);
    }));
}
