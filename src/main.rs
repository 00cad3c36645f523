fn main() {
    env_logger::init();
    if let Err(err) = diagram_canvas::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
