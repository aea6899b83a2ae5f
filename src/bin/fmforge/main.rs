use std::process::ExitCode;

mod cli;
mod commands;
mod display;
mod io;
mod util;

fn main() -> ExitCode {
    let cli = cli::parse();
    let common = match &cli.command {
        cli::Command::Layout(args) => &args.common,
        cli::Command::Tables(args) => &args.common,
    };

    init_logging(common.verbose);
    let ctx = display::Context::detect().with_quiet(common.quiet);

    if ctx.interactive {
        display::print_banner();
    }

    match commands::dispatch(cli.command, ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}
