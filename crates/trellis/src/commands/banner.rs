use std::path::Path;

/// Prints the trellis ASCII logo with version, used by start and
/// version.
pub fn print_logo() {
    let c = "\x1b[93m"; // Yellow — logo
    let d = "\x1b[90m"; // Dim gray — version
    let r = "\x1b[0m"; // Reset
    let v = env!("CARGO_PKG_VERSION");

    let ver = format!("v{v}");
    let pad = " ".repeat(30_usize.saturating_sub(ver.len()));

    println!();
    println!("  {c}▀█▀ █▀▀█ █▀▀ █   █   ▀█▀ █▀▀{r}");
    println!("  {c} █  █▄▄▀ █▀▀ █   █    █  ▀▀█{r}");
    println!("  {c} ▀  ▀  ▀ ▀▀▀ ▀▀▀ ▀▀▀ ▀▀▀ ▀▀▀{r}");
    println!("{pad}{d}{ver}{r}");
}

/// Prints the startup banner: logo, version and node directory.
pub fn print(dir: &Path) {
    let d = "\x1b[90m"; // Dim gray — labels
    let w = "\x1b[1;97m"; // Bold bright white — values
    let r = "\x1b[0m"; // Reset

    print_logo();
    println!();
    println!("  {d}Version{r}   {w}{}{r}", env!("CARGO_PKG_VERSION"));
    println!("  {d}Node dir{r}  {w}{}{r}", dir.display());
    println!();
}
