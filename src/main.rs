use anyhow::Result;
use tonality_core::EngineConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive("tonality=info".parse()?)
                .add_directive("tonality_core=info".parse()?),
        )
        .init();

    tonality::repl::start(EngineConfig::default())
}
