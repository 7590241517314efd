use super::banner;

/// Prints the component/version report.
pub fn execute() -> i32 {
    banner::print_logo();
    println!();
    println!(" Trellis    : {}", env!("CARGO_PKG_VERSION"));
    println!("   Core     : {}", trellis_core::VERSION);
    println!(" OS         : {}", std::env::consts::OS);
    println!(" Machine    : {}", std::env::consts::ARCH);
    println!();
    0
}
