use clap::Parser;
use vidmatch::Opts;
use vidmatch::cli::SubCommandExtend;
use vidmatch::config::SubCommand;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Run(cmd) => cmd.run(&opts).await,
        SubCommand::Query(cmd) => cmd.run(&opts).await,
        SubCommand::Stats(cmd) => cmd.run(&opts).await,
    }
}
