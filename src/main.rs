use graphite::uci;

fn main() {
    let code = uci::run();
    std::process::exit(code);
}
