use audino::cli::Cli;
use clap::CommandFactory;
use std::path::PathBuf;

/// Write audino.1 and one page per subcommand into the given directory (default: man/)
fn main() -> std::io::Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    std::fs::create_dir_all(&out_dir)?;

    let cmd = Cli::command();
    write_page(&out_dir, "audino", cmd.clone())?;
    for sub in cmd.get_subcommands() {
        let name = format!("audino-{}", sub.get_name());
        write_page(&out_dir, &name, sub.clone())?;
    }
    Ok(())
}

fn write_page(out_dir: &std::path::Path, name: &str, cmd: clap::Command) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    let path = out_dir.join(format!("{}.1", name));
    std::fs::write(&path, buffer)?;
    println!("Wrote {}", path.display());
    Ok(())
}
