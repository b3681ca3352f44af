fn main() {
    if let Err(err) = scan_enrich::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
