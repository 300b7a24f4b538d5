fn main() -> anyhow::Result<()> {
    watchdrift_lib::run()
}
