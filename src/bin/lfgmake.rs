//! Binary entry point for the `lfgmake` archiver tool.

use lfg::cli::make::{parse_make_args, print_usage, run};

fn main() {
    let args = match parse_make_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("lfgmake: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };
    if args.exit_early {
        std::process::exit(0);
    }
    std::process::exit(run(&args));
}
