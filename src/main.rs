fn main() -> anyhow::Result<()> {
    hack_toolchain::run()
}
