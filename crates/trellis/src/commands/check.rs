use std::path::Path;

use trellis_core::{config, log};

pub fn execute(dir: &Path, config_name: Option<&str>) -> i32 {
    log::init(log::Level::Info);
    let path = config::config_path(dir, config_name);

    println!("Checking node configuration file {}", path.display());

    match config::load(&path) {
        Ok(_) => {
            println!("Ok, configuration file looks good.");
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}
