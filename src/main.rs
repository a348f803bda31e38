use codeclip::{cli, logging, output, router};

fn main() {
    let cli = cli::parse();
    logging::init_logger(cli.verbose, cli.quiet);
    let json = cli.json;
    if let Err(err) = router::dispatch(cli) {
        std::process::exit(output::format_error(&err, json));
    }
}
