fn main() {
    if let Err(err) = feed_curator_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
