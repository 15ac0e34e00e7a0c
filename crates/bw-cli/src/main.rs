fn main() {
    bw_cli::init_tracing();
    std::process::exit(bw_cli::run_cli_from_args(std::env::args_os()));
}
