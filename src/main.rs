use std::process;

use micro_shell_rs::config::ConfigLoader;
use micro_shell_rs::repl::Repl;

fn main() {
    let config = ConfigLoader::load();
    let mut repl = Repl::new(config);
    let code = repl.run();
    process::exit(code);
}
