fn main() {
    if let Err(err) = weather_reconcile::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
