fn main() -> anyhow::Result<()> {
    notehub_tui::cli::run()
}
