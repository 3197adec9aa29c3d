//! gitdeck binary entry point.

fn main() -> anyhow::Result<()> {
    gitdeck::cli::run()
}
