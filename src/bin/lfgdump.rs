//! Binary entry point for the `lfgdump` extraction tool.

use lfg::cli::dump::{parse_dump_args, print_usage, run};

fn main() {
    let args = match parse_dump_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("lfgdump: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };
    if args.exit_early {
        std::process::exit(0);
    }
    std::process::exit(run(&args));
}
