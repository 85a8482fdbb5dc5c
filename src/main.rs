//! earscan CLI entry point.

#![allow(clippy::print_stderr)]

fn main() {
    match earscan::run() {
        Ok(earscan::RunStatus::Completed) => {}
        Ok(earscan::RunStatus::Interrupted) => std::process::exit(130),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
