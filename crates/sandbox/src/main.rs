mod app;

use tracing::error;

fn main() {
    if let Err(err) = app::run() {
        error!(error = %err, "fatal");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
