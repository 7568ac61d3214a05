fn main() {
    if let Err(err) = restserver::cli::run_cli() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
