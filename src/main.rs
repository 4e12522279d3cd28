fn main() {
    if let Err(err) = city_reconcile::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
