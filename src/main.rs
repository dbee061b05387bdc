use clap::Parser;

use dexgraph::cli::Args;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    std::process::exit(dexgraph::run(&args));
}
