fn main() {
    if let Err(err) = plex_renderer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
