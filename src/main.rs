fn main() -> anyhow::Result<()> {
    delegateto::run()?;
    Ok(())
}
